// Device shadow endpoint
//
// `GET /v2.0/cloud/thing/{device_id}/shadow/properties`, signed with the
// business payload layout (client id + access token + t + nonce + sts).

use tracing::{debug, warn};

use crate::client::{TuyaClient, unwrap_envelope};
use crate::error::Error;
use crate::models::{ShadowProperty, ShadowResult, TOKEN_INVALID_CODE};
use crate::signing::SignatureRequest;

/// Path of the shadow properties endpoint for one device.
pub fn shadow_path(device_id: &str) -> String {
    format!("/v2.0/cloud/thing/{device_id}/shadow/properties")
}

impl TuyaClient {
    /// Fetch the last reported value of every property of `device_id`.
    ///
    /// Obtains a token first, which may refresh it. If the platform
    /// reports the token as invalid the cache is dropped so the next call
    /// signs in again; this call still fails.
    pub async fn get_shadow(&self, device_id: &str) -> Result<Vec<ShadowProperty>, Error> {
        let token = self.access_token().await?;
        let request = SignatureRequest::get(shadow_path(device_id));
        let (status, body) = self.signed_get(&request, Some(&token)).await?;

        match unwrap_envelope::<ShadowResult>(status, &body) {
            Ok(result) => {
                debug!(
                    device_id,
                    properties = result.properties.len(),
                    "shadow fetched"
                );
                Ok(result.properties)
            }
            Err(rejection) => {
                if rejection.code == Some(TOKEN_INVALID_CODE) {
                    warn!(device_id, "platform rejected access token, dropping cache");
                    self.tokens().invalidate().await;
                }
                Err(Error::Shadow {
                    device_id: device_id.to_owned(),
                    message: rejection.message,
                    code: rejection.code,
                    body,
                })
            }
        }
    }
}
