//! Scan result listing (wpa_supplicant only)

use crate::ctrl::Session;
use crate::Result;

/// Highest BSS index queried
const MAX_BSS: usize = 1000;

/// Marker present in every BSS entry reply
const BSS_MARKER: &str = "bssid=";

impl Session {
    /// List the daemon's scan results
    ///
    /// Each element is the raw `BSS <n>` reply for one BSS. Stops at the
    /// first reply without a `bssid=` line.
    pub async fn scan_results(&mut self) -> Result<Vec<String>> {
        let mut results = Vec::new();

        for index in 0..MAX_BSS {
            let reply = self.request(&format!("BSS {}", index)).await?;
            if !reply.contains(BSS_MARKER) {
                break;
            }
            results.push(reply);
        }

        tracing::debug!("Collected {} scan results", results.len());
        Ok(results)
    }
}
