//! HTTP session against the iCloud sign-in and setup services.
//!
//! The session keeps the cookies and the handful of response headers the
//! service hands out during sign-in, and replays them on the following calls.

use crate::api_client::photos::PhotosService;
use crate::api_client::{ApiError, AuthBackend, AuthError, Challenge, TrustedDevice};
use crate::configuration::Endpoints;
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, InvalidHeaderValue, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Public widget key of the iCloud web client.
const WIDGET_KEY: &str = "d39ba9916b7251055b22c7f910e2ea796ee65e98b2ddecea8f5dde8d9d1a815d";

/// Response headers captured during sign-in, keyed by header name.
const SESSION_HEADERS: [(&str, SessionField); 5] = [
    ("X-Apple-ID-Account-Country", SessionField::AccountCountry),
    ("X-Apple-ID-Session-Id", SessionField::SessionId),
    ("X-Apple-Session-Token", SessionField::SessionToken),
    ("X-Apple-TwoSV-Trust-Token", SessionField::TrustToken),
    ("scnt", SessionField::Scnt),
];

#[derive(Debug, Clone, Copy)]
enum SessionField {
    AccountCountry,
    SessionId,
    SessionToken,
    TrustToken,
    Scnt,
}

#[derive(Debug, Default, Clone)]
struct SessionData {
    account_country: Option<String>,
    session_id: Option<String>,
    session_token: Option<String>,
    trust_token: Option<String>,
    scnt: Option<String>,
}

impl SessionData {
    fn slot(&mut self, field: SessionField) -> &mut Option<String> {
        match field {
            SessionField::AccountCountry => &mut self.account_country,
            SessionField::SessionId => &mut self.session_id,
            SessionField::SessionToken => &mut self.session_token,
            SessionField::TrustToken => &mut self.trust_token,
            SessionField::Scnt => &mut self.scnt,
        }
    }
}

/// Reply of `accountLogin`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountData {
    ds_info: DsInfo,
    #[serde(default)]
    hsa_challenge_required: bool,
    #[serde(default)]
    hsa_trusted_browser: bool,
    #[serde(default)]
    webservices: HashMap<String, WebService>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DsInfo {
    dsid: String,
    #[serde(default)]
    hsa_version: u8,
}

#[derive(Debug, Deserialize)]
struct WebService {
    url: String,
}

pub struct ICloudSession {
    client: Client,
    endpoints: Endpoints,
    client_id: String,
    data: SessionData,
    account: Option<AccountData>,
}

impl ICloudSession {
    pub fn new(endpoints: &Endpoints) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let invalid_home = |_: InvalidHeaderValue| {
            ApiError::UnexpectedResponse(format!("invalid home endpoint {}", endpoints.home))
        };
        headers.insert(ORIGIN, endpoints.home.parse().map_err(invalid_home)?);
        headers.insert(
            REFERER,
            format!("{}/", endpoints.home).parse().map_err(invalid_home)?,
        );

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoints: endpoints.clone(),
            client_id: new_client_id(),
            data: SessionData::default(),
            account: None,
        })
    }

    /// Opens the photo library of the signed-in account.
    pub async fn photos(&self, page_size: u32) -> Result<PhotosService, ApiError> {
        let account = self
            .account
            .as_ref()
            .ok_or(ApiError::NotAuthenticated("no account data, sign in first"))?;
        let service = account.webservices.get("ckdatabasews").ok_or_else(|| {
            ApiError::UnexpectedResponse("account has no ckdatabasews web service".to_string())
        })?;

        let params = vec![
            ("clientId".to_string(), self.client_id.clone()),
            ("dsid".to_string(), account.ds_info.dsid.clone()),
        ];
        PhotosService::open(self.client.clone(), &service.url, params, page_size).await
    }

    pub fn requires_2fa(&self) -> bool {
        self.account.as_ref().is_some_and(|a| {
            a.ds_info.hsa_version == 2 && (a.hsa_challenge_required || !self.is_trusted_session())
        })
    }

    pub fn requires_2sa(&self) -> bool {
        self.account.as_ref().is_some_and(|a| {
            a.ds_info.hsa_version >= 1 && (a.hsa_challenge_required || !self.is_trusted_session())
        })
    }

    fn challenge(&self) -> Challenge {
        if self.requires_2fa() {
            Challenge::TwoFactor
        } else if self.requires_2sa() {
            Challenge::TwoStep
        } else {
            Challenge::None
        }
    }

    fn setup_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("clientId", self.client_id.clone())];
        if let Some(account) = &self.account {
            params.push(("dsid", account.ds_info.dsid.clone()));
        }
        params
    }

    /// Adds the OAuth widget headers plus the session id and `scnt` echoes the
    /// sign-in service expects.
    fn with_auth_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        let mut builder = builder
            .header("Accept", "application/json")
            .header("X-Apple-OAuth-Client-Id", WIDGET_KEY)
            .header("X-Apple-OAuth-Client-Type", "firstPartyAuth")
            .header("X-Apple-OAuth-Redirect-URI", self.endpoints.home.as_str())
            .header("X-Apple-OAuth-Require-Grant-Code", "true")
            .header("X-Apple-OAuth-Response-Mode", "web_message")
            .header("X-Apple-OAuth-Response-Type", "code")
            .header("X-Apple-OAuth-State", self.client_id.as_str())
            .header("X-Apple-Widget-Key", WIDGET_KEY);

        if let Some(scnt) = &self.data.scnt {
            builder = builder.header("scnt", scnt.as_str());
        }
        if let Some(session_id) = &self.data.session_id {
            builder = builder.header("X-Apple-ID-Session-Id", session_id.as_str());
        }
        builder
    }

    fn capture_headers(&mut self, headers: &HeaderMap) {
        for (name, field) in SESSION_HEADERS {
            if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
                *self.data.slot(field) = Some(value.to_string());
            }
        }
    }

    async fn account_login(&mut self) -> Result<(), ApiError> {
        let body = json!({
            "accountCountryCode": self.data.account_country,
            "dsWebAuthToken": self.data.session_token,
            "extended_login": true,
            "trustToken": self.data.trust_token.clone().unwrap_or_default(),
        });

        let response = self
            .client
            .post(format!("{}/accountLogin", self.endpoints.setup))
            .json(&body)
            .send()
            .await?;
        let account: AccountData = ensure_success(response).await?.json().await?;

        debug!(
            hsa_version = account.ds_info.hsa_version,
            challenge_required = account.hsa_challenge_required,
            trusted = account.hsa_trusted_browser,
            "account login"
        );
        self.account = Some(account);
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for ICloudSession {
    async fn sign_in(&mut self, username: &str, password: &str) -> Result<Challenge, AuthError> {
        let body = json!({
            "accountName": username,
            "password": password,
            "rememberMe": true,
            "trustTokens": self.data.trust_token.iter().collect::<Vec<_>>(),
        });

        let request = self
            .client
            .post(format!("{}/signin", self.endpoints.auth))
            .query(&[("isRememberMeEnabled", "true")])
            .json(&body);
        let response = self
            .with_auth_headers(request)
            .send()
            .await
            .map_err(ApiError::from)?;
        self.capture_headers(response.headers());

        match response.status() {
            // 409 means a second factor is pending.
            status if status.is_success() || status == StatusCode::CONFLICT => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AuthError::InvalidCredentials)
            }
            _ => return Err(status_error(response).await.into()),
        }

        self.account_login().await?;
        Ok(self.challenge())
    }

    async fn validate_2fa_code(&mut self, code: &str) -> Result<bool, ApiError> {
        let request = self
            .client
            .post(format!(
                "{}/verify/trusteddevice/securitycode",
                self.endpoints.auth
            ))
            .json(&json!({ "securityCode": { "code": code } }));
        let response = self.with_auth_headers(request).send().await?;
        self.capture_headers(response.headers());

        if is_rejected_code(response.status()) {
            debug!(status = %response.status(), "security code rejected");
            return Ok(false);
        }
        ensure_success(response).await?;
        Ok(true)
    }

    fn is_trusted_session(&self) -> bool {
        self.account.as_ref().is_some_and(|a| a.hsa_trusted_browser)
    }

    async fn trust_session(&mut self) -> Result<bool, ApiError> {
        let request = self
            .client
            .get(format!("{}/2sv/trust", self.endpoints.auth));
        let response = self.with_auth_headers(request).send().await?;
        self.capture_headers(response.headers());

        if !response.status().is_success() {
            debug!(status = %response.status(), "session trust refused");
            return Ok(false);
        }

        match self.account_login().await {
            Ok(()) => Ok(true),
            Err(ApiError::Status { status, message }) => {
                debug!(status, body = %message, "account login after trust failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn trusted_devices(&mut self) -> Result<Vec<TrustedDevice>, ApiError> {
        let response = self
            .client
            .get(format!("{}/listDevices", self.endpoints.setup))
            .query(&self.setup_params())
            .send()
            .await?;
        let body: Value = ensure_success(response).await?.json().await?;

        Ok(body["devices"]
            .as_array()
            .map(|devices| devices.iter().cloned().map(TrustedDevice::new).collect())
            .unwrap_or_default())
    }

    async fn send_verification_code(&mut self, device: &TrustedDevice) -> Result<bool, ApiError> {
        let response = self
            .client
            .post(format!("{}/sendVerificationCode", self.endpoints.setup))
            .query(&self.setup_params())
            .json(device.record())
            .send()
            .await?;
        let body: Value = ensure_success(response).await?.json().await?;

        Ok(body["success"].as_bool().unwrap_or(false))
    }

    async fn validate_verification_code(
        &mut self,
        device: &TrustedDevice,
        code: &str,
    ) -> Result<bool, ApiError> {
        let mut record = device.record().clone();
        if let Some(fields) = record.as_object_mut() {
            fields.insert("verificationCode".to_string(), json!(code));
            fields.insert("trustBrowser".to_string(), json!(true));
        }

        let response = self
            .client
            .post(format!("{}/validateVerificationCode", self.endpoints.setup))
            .query(&self.setup_params())
            .json(&record)
            .send()
            .await?;

        if is_rejected_code(response.status()) {
            return Ok(false);
        }
        ensure_success(response).await?;

        // The code stands even when the service declines to trust the browser.
        if !self.trust_session().await? {
            warn!("session not trusted after two-step verification");
        }
        Ok(true)
    }
}

/// The service answers a wrong code with a client error carrying code -21669.
fn is_rejected_code(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    )
}

pub(crate) async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response).await)
    }
}

async fn status_error(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    ApiError::Status { status, message }
}

/// `auth-` followed by a random, version-4 style UUID.
fn new_client_id() -> String {
    let mut bytes: [u8; 16] = rand::thread_rng().gen();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "auth-{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
