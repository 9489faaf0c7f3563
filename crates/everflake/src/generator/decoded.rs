use serde::{Deserialize, Serialize};

/// The structured record recovered from an identifier.
///
/// The serde field names (`UID`, `dataCenterId`, ..) are the wire names the
/// decode endpoint has always used; keep them stable for downstream
/// consumers. How the record is ultimately rendered - JSON, a log line, a
/// template - is the caller's business.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedUid {
    /// The identifier in its plain decimal form.
    #[serde(rename = "UID")]
    pub uid: String,
    /// The allocation instant, `YYYY-MM-DD HH:MM:SS` in UTC.
    pub timestamp: String,
    /// The data center of the allocating instance.
    #[serde(rename = "dataCenterId")]
    pub data_center_id: u64,
    /// The worker id of the allocating instance.
    #[serde(rename = "workerId")]
    pub worker_id: u64,
    /// The identifier's position within its allocation second.
    pub sequence: u64,
}
