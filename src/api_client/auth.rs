//! Interactive sign-in as an explicit state machine.
//!
//! The flow is credential exchange, then an optional second factor (a code
//! pushed to an approved device, or a code sent to a chosen trusted device),
//! then an optional request to trust the session. The remote calls sit behind
//! [`AuthBackend`]; the questions go through [`Console`].

use crate::api_client::{ApiError, AuthError, Challenge, TrustedDevice};
use crate::foundation::console::Console;
use async_trait::async_trait;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

/// The remote side of the sign-in flow.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuthBackend: Send {
    /// Exchanges the primary credentials and reports what is still required.
    async fn sign_in(&mut self, username: &str, password: &str) -> Result<Challenge, AuthError>;

    /// Checks a code pushed to an approved device. `false` means rejected.
    async fn validate_2fa_code(&mut self, code: &str) -> Result<bool, ApiError>;

    fn is_trusted_session(&self) -> bool;

    /// Asks the service to remember this session. `false` means refused.
    async fn trust_session(&mut self) -> Result<bool, ApiError>;

    async fn trusted_devices(&mut self) -> Result<Vec<TrustedDevice>, ApiError>;

    async fn send_verification_code(&mut self, device: &TrustedDevice) -> Result<bool, ApiError>;

    async fn validate_verification_code(
        &mut self,
        device: &TrustedDevice,
        code: &str,
    ) -> Result<bool, ApiError>;
}

#[derive(Debug)]
pub enum AuthState {
    AwaitingCredentials,
    /// `device` is `None` for a pushed two-factor code and the chosen device
    /// for a two-step code.
    AwaitingSecondFactor { device: Option<TrustedDevice> },
    AwaitingDeviceSelection,
    AwaitingTrustConfirmation,
    Authenticated,
    Failed(AuthError),
}

/// Drives `backend` from credentials to an authenticated session.
///
/// Returns the authenticated backend, which then serves as the session handle.
/// Failures are reported on the console before being returned.
pub async fn authenticate<B, C>(mut backend: B, console: &C) -> Result<B, AuthError>
where
    B: AuthBackend,
    C: Console + ?Sized,
{
    let mut state = AuthState::AwaitingCredentials;

    loop {
        debug!(?state, "authentication step");
        state = match state {
            AuthState::Authenticated => return Ok(backend),
            AuthState::Failed(error) => {
                console.error(&error.to_string());
                return Err(error);
            }
            pending => advance(&mut backend, console, pending)
                .await
                .unwrap_or_else(AuthState::Failed),
        };
    }
}

async fn advance<B, C>(backend: &mut B, console: &C, state: AuthState) -> Result<AuthState, AuthError>
where
    B: AuthBackend,
    C: Console + ?Sized,
{
    match state {
        AuthState::AwaitingCredentials => {
            let username = console.prompt("Enter your username:")?;
            let password = console.prompt(&format!("Enter the password for {username}:"))?;

            Ok(match backend.sign_in(&username, &password).await? {
                Challenge::None => AuthState::Authenticated,
                Challenge::TwoFactor => {
                    console.info("Two-factor authentication required.");
                    AuthState::AwaitingSecondFactor { device: None }
                }
                Challenge::TwoStep => AuthState::AwaitingDeviceSelection,
            })
        }

        AuthState::AwaitingSecondFactor { device: None } => {
            let code =
                console.prompt("Enter the code you received of one of your approved devices:")?;
            if !backend.validate_2fa_code(&code).await? {
                return Err(AuthError::CodeRejected);
            }

            Ok(if backend.is_trusted_session() {
                AuthState::Authenticated
            } else {
                AuthState::AwaitingTrustConfirmation
            })
        }

        AuthState::AwaitingSecondFactor {
            device: Some(device),
        } => {
            let code = console.prompt("Please enter validation code:")?;
            if !backend.validate_verification_code(&device, &code).await? {
                return Err(AuthError::CodeRejected);
            }
            Ok(AuthState::Authenticated)
        }

        AuthState::AwaitingDeviceSelection => {
            let devices = backend.trusted_devices().await?;
            if devices.is_empty() {
                return Err(AuthError::NoTrustedDevices);
            }

            console.info("Two-step authentication required. Your trusted devices are:");
            for (idx, device) in devices.iter().enumerate() {
                console.info(&format!("  {idx}: {}", device.label()));
            }

            let device = choose_device(console, devices)?;
            if !backend.send_verification_code(&device).await? {
                return Err(AuthError::CodeNotSent);
            }
            Ok(AuthState::AwaitingSecondFactor {
                device: Some(device),
            })
        }

        AuthState::AwaitingTrustConfirmation => {
            console.info("Session is not trusted. Requesting trust...");
            match backend.trust_session().await {
                Ok(true) => {}
                Ok(false) => refuse_trust(console),
                Err(e) => {
                    warn!(error = %e, "trust request failed");
                    refuse_trust(console);
                }
            }
            // A verified but untrusted session still works until it expires.
            Ok(AuthState::Authenticated)
        }

        done @ (AuthState::Authenticated | AuthState::Failed(_)) => Ok(done),
    }
}

fn refuse_trust<C: Console + ?Sized>(console: &C) {
    console.warn(
        "Failed to request trust. You will likely be prompted for the code again in the coming weeks",
    );
}

/// Asks for a device index until a valid one is given. Empty input picks 0.
fn choose_device<C: Console + ?Sized>(
    console: &C,
    mut devices: Vec<TrustedDevice>,
) -> Result<TrustedDevice, AuthError> {
    loop {
        let answer = console.prompt("Which device would you like to use? [0]:")?;
        let choice = if answer.is_empty() {
            Some(0)
        } else {
            answer.parse::<usize>().ok()
        };

        match choice {
            Some(idx) if idx < devices.len() => return Ok(devices.swap_remove(idx)),
            _ => console.warn(&format!(
                "Please enter a number between 0 and {}.",
                devices.len() - 1
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::console::MockConsole;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn chatty_console() -> MockConsole {
        let mut console = MockConsole::new();
        console.expect_info().returning(|_| ());
        console.expect_warn().returning(|_| ());
        console.expect_error().returning(|_| ());
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Enter your username"))
            .returning(|_| Ok("user@example.com".to_string()));
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Enter the password for user@example.com"))
            .returning(|_| Ok("hunter2".to_string()));
        console
    }

    fn devices() -> Vec<TrustedDevice> {
        vec![
            TrustedDevice::new(json!({"deviceName": "iPhone", "deviceId": "1"})),
            TrustedDevice::new(json!({"phoneNumber": "********42", "deviceId": "2"})),
        ]
    }

    #[tokio::test]
    async fn test_no_challenge_authenticates() {
        let console = chatty_console();
        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .withf(|username, password| username == "user@example.com" && password == "hunter2")
            .times(1)
            .returning(|_, _| Ok(Challenge::None));

        assert!(authenticate(backend, &console).await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_credentials_fail() {
        let mut console = chatty_console();
        console.checkpoint();
        console.expect_info().returning(|_| ());
        console
            .expect_prompt()
            .returning(|_| Ok("whatever".to_string()));
        console
            .expect_error()
            .withf(|m| m.contains("invalid username or password"))
            .times(1)
            .returning(|_| ());

        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .returning(|_, _| Err(AuthError::InvalidCredentials));

        let result = authenticate(backend, &console).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_two_factor_trusted_session() {
        let mut console = chatty_console();
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Enter the code"))
            .times(1)
            .returning(|_| Ok("123456".to_string()));

        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .returning(|_, _| Ok(Challenge::TwoFactor));
        backend
            .expect_validate_2fa_code()
            .withf(|code| code == "123456")
            .times(1)
            .returning(|_| Ok(true));
        backend.expect_is_trusted_session().return_const(true);
        backend.expect_trust_session().never();

        assert!(authenticate(backend, &console).await.is_ok());
    }

    #[tokio::test]
    async fn test_two_factor_rejected_code_fails() {
        let mut console = chatty_console();
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Enter the code"))
            .returning(|_| Ok("000000".to_string()));

        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .returning(|_, _| Ok(Challenge::TwoFactor));
        backend.expect_validate_2fa_code().returning(|_| Ok(false));

        let result = authenticate(backend, &console).await;
        assert!(matches!(result, Err(AuthError::CodeRejected)));
    }

    #[tokio::test]
    async fn test_two_factor_untrusted_requests_trust() {
        let mut console = chatty_console();
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Enter the code"))
            .returning(|_| Ok("123456".to_string()));

        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .returning(|_, _| Ok(Challenge::TwoFactor));
        backend.expect_validate_2fa_code().returning(|_| Ok(true));
        backend.expect_is_trusted_session().return_const(false);
        backend
            .expect_trust_session()
            .times(1)
            .returning(|| Ok(true));

        assert!(authenticate(backend, &console).await.is_ok());
    }

    #[tokio::test]
    async fn test_refused_trust_only_warns() {
        let mut console = MockConsole::new();
        console.expect_info().returning(|_| ());
        console.expect_error().never();
        console
            .expect_warn()
            .withf(|m| m.starts_with("Failed to request trust"))
            .times(1)
            .returning(|_| ());
        console
            .expect_prompt()
            .returning(|_| Ok("answer".to_string()));

        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .returning(|_, _| Ok(Challenge::TwoFactor));
        backend.expect_validate_2fa_code().returning(|_| Ok(true));
        backend.expect_is_trusted_session().return_const(false);
        backend.expect_trust_session().returning(|| Ok(false));

        assert!(authenticate(backend, &console).await.is_ok());
    }

    #[tokio::test]
    async fn test_two_step_flow_with_default_device() {
        let mut console = chatty_console();
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Which device"))
            .times(1)
            .returning(|_| Ok(String::new()));
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Please enter validation code"))
            .times(1)
            .returning(|_| Ok("4242".to_string()));

        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .returning(|_, _| Ok(Challenge::TwoStep));
        backend.expect_trusted_devices().returning(|| Ok(devices()));
        backend
            .expect_send_verification_code()
            .withf(|device| device.label() == "iPhone")
            .times(1)
            .returning(|_| Ok(true));
        backend
            .expect_validate_verification_code()
            .withf(|device, code| device.label() == "iPhone" && code == "4242")
            .times(1)
            .returning(|_, _| Ok(true));

        assert!(authenticate(backend, &console).await.is_ok());
    }

    #[tokio::test]
    async fn test_two_step_reprompts_invalid_device() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();

        let mut console = chatty_console();
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Which device"))
            .times(3)
            .returning(move |_| {
                let answer = match seen.fetch_add(1, Ordering::SeqCst) {
                    0 => "seven",
                    1 => "5",
                    _ => "1",
                };
                Ok(answer.to_string())
            });
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Please enter validation code"))
            .returning(|_| Ok("4242".to_string()));

        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .returning(|_, _| Ok(Challenge::TwoStep));
        backend.expect_trusted_devices().returning(|| Ok(devices()));
        backend
            .expect_send_verification_code()
            .withf(|device| device.label() == "SMS to ********42")
            .returning(|_| Ok(true));
        backend
            .expect_validate_verification_code()
            .returning(|_, _| Ok(true));

        assert!(authenticate(backend, &console).await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_two_step_send_failure() {
        let mut console = chatty_console();
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Which device"))
            .returning(|_| Ok("0".to_string()));

        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .returning(|_, _| Ok(Challenge::TwoStep));
        backend.expect_trusted_devices().returning(|| Ok(devices()));
        backend
            .expect_send_verification_code()
            .returning(|_| Ok(false));
        backend.expect_validate_verification_code().never();

        let result = authenticate(backend, &console).await;
        assert!(matches!(result, Err(AuthError::CodeNotSent)));
    }

    #[tokio::test]
    async fn test_two_step_rejected_code() {
        let mut console = chatty_console();
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Which device"))
            .returning(|_| Ok("0".to_string()));
        console
            .expect_prompt()
            .withf(|m| m.starts_with("Please enter validation code"))
            .returning(|_| Ok("bad".to_string()));

        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .returning(|_, _| Ok(Challenge::TwoStep));
        backend.expect_trusted_devices().returning(|| Ok(devices()));
        backend
            .expect_send_verification_code()
            .returning(|_| Ok(true));
        backend
            .expect_validate_verification_code()
            .returning(|_, _| Ok(false));

        let result = authenticate(backend, &console).await;
        assert!(matches!(result, Err(AuthError::CodeRejected)));
    }

    #[tokio::test]
    async fn test_two_step_without_devices() {
        let console = chatty_console();
        let mut backend = MockAuthBackend::new();
        backend
            .expect_sign_in()
            .returning(|_, _| Ok(Challenge::TwoStep));
        backend.expect_trusted_devices().returning(|| Ok(Vec::new()));

        let result = authenticate(backend, &console).await;
        assert!(matches!(result, Err(AuthError::NoTrustedDevices)));
    }
}
