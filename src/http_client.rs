use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use crate::error::LedgerError;

const REQUEST_TIMEOUT_SECS: u64 = 20;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client, reqwest::Error> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
    })
}

pub fn fetch_text(url: &str) -> Result<String, LedgerError> {
    let resp = http_client()?
        .get(url)
        .header(USER_AGENT, "Mozilla/5.0")
        .send()?;
    let status = resp.status();
    if !status.is_success() {
        return Err(LedgerError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp.text()?)
}
