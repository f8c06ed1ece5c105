mod sector;

pub use sector::SectorAlarmConfig;

use serde::Deserialize;

use crate::security_system::AlarmState;

/// Login data of one alarm site. Passed through to the alarm service as-is.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub site_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .field("site_id", &self.site_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmStatus {
    pub armed_status: AlarmState,
}

pub trait AlarmService {
    type Session: AlarmSession;

    async fn connect(&self, credentials: &Credentials) -> anyhow::Result<Self::Session>;
}

/// An authenticated connection to one alarm site.
pub trait AlarmSession {
    async fn status(&self) -> anyhow::Result<AlarmStatus>;

    async fn arm(&self, code: &str) -> anyhow::Result<()>;

    async fn partial_arm(&self, code: &str) -> anyhow::Result<()>;

    async fn disarm(&self, code: &str) -> anyhow::Result<()>;
}
