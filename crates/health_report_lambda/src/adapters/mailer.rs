pub trait Mailer {
    /// Sends a pre-built MIME message and returns the provider message id.
    fn send_raw(
        &self,
        sender: &str,
        recipients: &[String],
        raw_message: &[u8],
    ) -> Result<String, String>;
}
