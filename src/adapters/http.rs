//! HTTPS client adapter for the telemetry uplink (ESP-IDF only).
//!
//! Each update opens a fresh `EspHttpConnection` with the certificate
//! bundle attached, POSTs the form body and copies the start of the
//! response into the caller's buffer. The connection is dropped after
//! every request.

use core::time::Duration;

use embedded_svc::http::client::Client as HttpClient;
use embedded_svc::http::{Method, Status};
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::client::{Configuration as HttpClientConfiguration, EspHttpConnection};
use log::{debug, warn};

use crate::error::CommsError;
use crate::telemetry::uplink::HttpTransport;

pub struct EspHttpsTransport {
    timeout: Duration,
}

impl EspHttpsTransport {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout: Duration::from_millis(u64::from(timeout_ms)),
        }
    }

    fn client(&self) -> Result<HttpClient<EspHttpConnection>, CommsError> {
        let conf = HttpClientConfiguration {
            timeout: Some(self.timeout),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let conn = EspHttpConnection::new(&conf).map_err(|e| {
            warn!("HTTP: connection setup failed: {:?}", e);
            CommsError::RequestFailed
        })?;
        Ok(HttpClient::wrap(conn))
    }
}

impl HttpTransport for EspHttpsTransport {
    fn post_form(&mut self, url: &str, body: &str, response: &mut [u8]) -> Result<usize, CommsError> {
        let mut client = self.client()?;

        let mut len_buf = heapless::String::<8>::new();
        core::fmt::Write::write_fmt(&mut len_buf, format_args!("{}", body.len()))
            .map_err(|_| CommsError::PayloadTooLarge)?;
        let headers = [
            ("Content-Type", "application/x-www-form-urlencoded"),
            ("Content-Length", len_buf.as_str()),
            ("Connection", "close"),
        ];

        let mut request = client
            .request(Method::Post, url, &headers)
            .map_err(|_| CommsError::RequestFailed)?;
        request
            .write_all(body.as_bytes())
            .map_err(|_| CommsError::RequestFailed)?;
        request.flush().map_err(|_| CommsError::RequestFailed)?;
        let mut reply = request.submit().map_err(|e| {
            debug!("HTTP: submit failed: {:?}", e);
            CommsError::Timeout
        })?;

        let status = reply.status();
        if !(200..300).contains(&status) {
            return Err(CommsError::HttpStatus(status));
        }

        let mut filled = 0;
        while filled < response.len() {
            let n = reply
                .read(&mut response[filled..])
                .map_err(|_| CommsError::RequestFailed)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }
}
