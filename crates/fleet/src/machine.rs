use serde::Serialize;

/// Placement metadata the machine oracle knows for cloud hosts. Absent for
/// machines outside AWS.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AwsMetadata {
    pub region: String,
    pub availability_zone: String,
}

/// One entry of a fleet snapshot from the machine oracle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Machine {
    pub host_name: String,
    pub instance_id: String,
    pub aws: Option<AwsMetadata>,
}

impl Machine {
    pub fn new(host_name: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            instance_id: instance_id.into(),
            aws: None,
        }
    }
}
