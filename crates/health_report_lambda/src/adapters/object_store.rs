use health_report_core::storage_keys::ObjectTarget;

pub trait ReportStore {
    fn write_object(&self, target: &ObjectTarget, body: &[u8]) -> Result<(), String>;
}
