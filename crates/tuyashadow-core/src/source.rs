// ── Shadow source seam ──
//
// The poller only needs "give me the properties of device X". Production
// code answers that with `TuyaClient`; tests plug in scripted sources.

use futures_util::future::BoxFuture;

use tuyashadow_api::{Error, ShadowProperty, TuyaClient};

/// Anything that can fetch the current shadow of one device.
pub trait ShadowSource: Send + Sync + 'static {
    fn fetch_shadow<'a>(
        &'a self,
        device_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ShadowProperty>, Error>>;
}

impl ShadowSource for TuyaClient {
    fn fetch_shadow<'a>(
        &'a self,
        device_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ShadowProperty>, Error>> {
        Box::pin(self.get_shadow(device_id))
    }
}
