use anyhow::Context;
use infrastructure::HttpClientConfig;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};

use super::{AlarmService, AlarmSession, AlarmStatus, Credentials};
use crate::security_system::AlarmState;

#[derive(Clone, Deserialize)]
pub struct SectorAlarmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    pub email: String,
    pub password: String,
    pub site_id: String,
    pub code: String,
}

impl std::fmt::Debug for SectorAlarmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectorAlarmConfig")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("credentials", &self.credentials())
            .field("code", &"***")
            .finish()
    }
}

fn default_base_url() -> String {
    "https://mypagesapi.sectoralarm.net".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl SectorAlarmConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: self.email.clone(),
            password: self.password.clone(),
            site_id: self.site_id.clone(),
        }
    }

    pub fn new_client(&self) -> SectorAlarmClient {
        SectorAlarmClient::new(&self.base_url, self.timeout_ms)
    }
}

#[derive(Debug, Clone)]
pub struct SectorAlarmClient {
    base_url: String,
    timeout_ms: u64,
}

impl SectorAlarmClient {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout_ms,
        }
    }
}

impl AlarmService for SectorAlarmClient {
    type Session = SectorAlarmSession;

    #[tracing::instrument(skip_all, fields(site_id = %credentials.site_id))]
    async fn connect(&self, credentials: &Credentials) -> anyhow::Result<SectorAlarmSession> {
        let client = HttpClientConfig::default()
            .with_timeout_ms(self.timeout_ms)
            .new_tracing_client()?;

        let response = client
            .post(format!("{}/api/Login/Login", self.base_url))
            .json(&LoginRequest {
                user_id: &credentials.email,
                password: &credentials.password,
            })
            .send()
            .await
            .context("Error sending login request")?
            .error_for_status()
            .context("Login rejected by Sector Alarm")?;

        let login: LoginResponse = response.json().await.context("Error parsing login response")?;

        tracing::debug!("Logged in to Sector Alarm");

        let client = HttpClientConfig::new(Some(login.authorization_token))
            .with_timeout_ms(self.timeout_ms)
            .new_tracing_client()?;

        Ok(SectorAlarmSession {
            client,
            base_url: self.base_url.clone(),
            panel_id: credentials.site_id.clone(),
        })
    }
}

pub struct SectorAlarmSession {
    client: ClientWithMiddleware,
    base_url: String,
    panel_id: String,
}

impl SectorAlarmSession {
    async fn send_panel_command(&self, action: &str, code: &str) -> anyhow::Result<()> {
        let request = PanelCommandRequest {
            panel_id: &self.panel_id,
            panel_code: code,
            platform: "app",
        };

        self.client
            .post(format!("{}/api/Panel/{}", self.base_url, action))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Error sending {} request", action))?
            .error_for_status()
            .with_context(|| format!("{} rejected by Sector Alarm", action))?;

        Ok(())
    }
}

impl AlarmSession for SectorAlarmSession {
    async fn status(&self) -> anyhow::Result<AlarmStatus> {
        let response = self
            .client
            .get(format!("{}/api/Panel/GetPanelStatus", self.base_url))
            .query(&[("panelId", &self.panel_id)])
            .send()
            .await
            .context("Error requesting panel status")?
            .error_for_status()
            .context("Panel status rejected by Sector Alarm")?;

        let status: PanelStatusResponse = response.json().await.context("Error parsing panel status")?;

        Ok(AlarmStatus {
            armed_status: status.armed_status,
        })
    }

    async fn arm(&self, code: &str) -> anyhow::Result<()> {
        self.send_panel_command("Arm", code).await
    }

    async fn partial_arm(&self, code: &str) -> anyhow::Result<()> {
        self.send_panel_command("PartialArm", code).await
    }

    async fn disarm(&self, code: &str) -> anyhow::Result<()> {
        self.send_panel_command("Disarm", code).await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LoginRequest<'a> {
    #[serde(rename = "UserId")]
    user_id: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoginResponse {
    authorization_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PanelCommandRequest<'a> {
    panel_id: &'a str,
    panel_code: &'a str,
    platform: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PanelStatusResponse {
    armed_status: AlarmState,
}
