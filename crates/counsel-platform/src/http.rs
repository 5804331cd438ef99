//! `HttpPort` over the browser `fetch()` API.
//!
//! Any HTTP status comes back as `Ok`; status handling belongs to the
//! core adapter. Only a request that never got an answer is an error.

use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder};
use js_sys::{Array, Uint8Array};
use web_sys::{Blob, BlobPropertyBag, FormData};

use counsel_core::ports::{FilePart, HttpPort, HttpRequest, HttpResponse, Method, RequestBody};
use counsel_types::{ClientError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

impl FetchTransport {
    pub fn new() -> Self {
        Self
    }

    fn builder(req: &HttpRequest) -> RequestBuilder {
        let builder = match req.method {
            Method::Get => Request::get(&req.url),
            Method::Post => Request::post(&req.url),
            Method::Put => Request::put(&req.url),
            Method::Delete => Request::delete(&req.url),
        };
        let builder = if req.query.is_empty() {
            builder
        } else {
            builder.query(req.query.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        };
        req.headers
            .iter()
            .fold(builder, |b, (name, value)| b.header(name, value))
    }
}

#[async_trait(?Send)]
impl HttpPort for FetchTransport {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse> {
        let builder = Self::builder(&req);
        let request = match req.body {
            RequestBody::Empty => builder.build(),
            RequestBody::Json(ref body) => builder.body(body.to_string()),
            // The browser sets the multipart boundary header itself.
            RequestBody::Multipart(ref file) => builder.body(form_data(file)?),
        }
        .map_err(|e| ClientError::transport(e.to_string()))?;

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::transport(e.to_string()))?;
        Ok(HttpResponse::new(status, body))
    }
}

fn form_data(file: &FilePart) -> Result<FormData> {
    let parts = Array::new();
    parts.push(&Uint8Array::from(file.bytes.as_slice()));

    let options = BlobPropertyBag::new();
    options.set_type(&file.mime);
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)
        .map_err(|e| ClientError::transport(format!("{:?}", e)))?;

    let form = FormData::new().map_err(|e| ClientError::transport(format!("{:?}", e)))?;
    form.append_with_blob_and_filename(&file.field, &blob, &file.file_name)
        .map_err(|e| ClientError::transport(format!("{:?}", e)))?;
    Ok(form)
}
