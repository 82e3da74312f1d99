use crate::store::StoreError;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

const ID_BYTES: usize = 12;

pub async fn with_timeout<F, T>(duration: Duration, task: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(duration, task)
        .await
        .map_err(|_| StoreError::Timeout(duration))?
}

pub fn generate_id() -> String {
    let random_id: [u8; ID_BYTES] = rand::thread_rng().gen();
    BASE64_URL_SAFE_NO_PAD.encode(random_id)
}
