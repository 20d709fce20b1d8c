//! Client-side verification against a signer's published keys.
//!
//! A verifier that does not hold the signer locally fetches the public
//! signer document from the OWID's own domain and checks the signature
//! against the published key history. Timeouts follow the deadline
//! configured on the client provided by the caller.

use owid_core::{Owid, PublicSigner, OWID_VERSION_1};

use crate::error::ServiceError;

/// Fetch the public signer document published by the domain.
pub async fn fetch_public_signer(
    client: &reqwest::Client,
    scheme: &str,
    domain: &str,
) -> Result<PublicSigner, ServiceError> {
    let url = format!("{scheme}://{domain}/owid/api/v{OWID_VERSION_1}/signer");
    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(ServiceError::RemoteStatus {
            domain: domain.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response.json().await?)
}

/// Verify the OWID by fetching the public keys from its domain.
///
/// The OWID must carry its target bytes.
pub async fn verify_remote(
    client: &reqwest::Client,
    owid: &Owid,
    scheme: &str,
) -> Result<bool, ServiceError> {
    let public = fetch_public_signer(client, scheme, &owid.domain).await?;
    Ok(public.verify(owid)?)
}
