use super::*;
use futures::stream;
use js_sys::{Array, Function, Reflect, Uint8Array};
use web_sys::ReadableStreamDefaultReader;

/// Global `fetch` of the window or worker scope
pub struct WebNetwork {
    global: JsValue,
    fetch: Function,
}

impl WebNetwork {
    pub fn new() -> Result<Self> {
        let global: JsValue = js_sys::global().into();
        let fetch = Reflect::get(&global, &"fetch".into())?
            .dyn_into::<Function>()
            .map_err(|_| e!("fetch is not available in this scope"))?;
        Ok(Self { global, fetch })
    }

    pub(crate) async fn send(&self, request: &web_sys::Request) -> Result<web_sys::Response> {
        let promise = self.fetch.call1(&self.global, request)?.unchecked_into::<Promise>();
        Ok(resolve(promise).await?.unchecked_into())
    }
}

#[async_trait(?Send)]
impl Network for WebNetwork {
    async fn fetch(&self, request: Request) -> Result<Response> {
        let request = into_websys_request(&request)?;
        let response = self.send(&request).await?;
        from_websys_response(response).await
    }

    async fn fetch_streaming(&self, url: &str) -> Result<StreamingResponse> {
        let request = web_sys::Request::new_with_str(url)?;
        let response = self.send(&request).await?;
        let status = status_of(&response)?;
        let headers = collect_headers(&response.headers())?;
        let body = match response.body() {
            Some(body) => read_stream(body.get_reader().unchecked_into()),
            None => stream::empty().boxed_local(),
        };
        Ok(StreamingResponse {
            status,
            headers,
            body,
        })
    }
}

fn read_stream(reader: ReadableStreamDefaultReader) -> LocalBoxStream<'static, Result<Bytes>> {
    stream::unfold(Some(reader), |reader| async move {
        let reader = reader?;
        match read_chunk(&reader).await {
            Ok(Some(chunk)) => Some((Ok(chunk), Some(reader))),
            Ok(None) => None,
            // stop after reporting the failure
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed_local()
}

async fn read_chunk(reader: &ReadableStreamDefaultReader) -> Result<Option<Bytes>> {
    let item = resolve(reader.read()).await?;
    if Reflect::get(&item, &"done".into())?.is_truthy() {
        return Ok(None);
    }
    let value = Reflect::get(&item, &"value".into())?.unchecked_into::<Uint8Array>();
    Ok(Some(Bytes::from(value.to_vec())))
}

fn status_of(response: &web_sys::Response) -> Result<StatusCode> {
    StatusCode::from_u16(response.status()).somehow()
}

pub(crate) fn collect_headers(headers: &web_sys::Headers) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    let Some(entries) = js_sys::try_iter(headers)? else {
        return Ok(map);
    };
    for entry in entries {
        let pair = entry?.unchecked_into::<Array>();
        let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) else {
            continue;
        };
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) else {
            continue;
        };
        map.append(name, value);
    }
    Ok(map)
}

fn into_websys_headers(headers: &HeaderMap) -> Result<web_sys::Headers> {
    let websys_headers = web_sys::Headers::new()?;
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        websys_headers.append(name.as_str(), value)?;
    }
    Ok(websys_headers)
}

pub(crate) fn into_websys_request(request: &Request) -> Result<web_sys::Request> {
    let init = web_sys::RequestInit::new();
    init.set_method(request.method().as_str());
    init.set_headers(&into_websys_headers(request.headers())?);
    if !request.body().is_empty() {
        init.set_body(&Uint8Array::from(&request.body()[..]));
    }
    Ok(web_sys::Request::new_with_str_and_init(
        &request.uri().to_string(),
        &init,
    )?)
}

/// Method, url and headers of the request. The body is left unread so the original
/// request can still be sent.
pub(crate) fn request_head(request: &web_sys::Request) -> Result<Request> {
    let mut builder = http::Request::builder()
        .method(request.method().as_str())
        .uri(request.url());
    if let Some(headers) = builder.headers_mut() {
        *headers = collect_headers(&request.headers())?;
    }
    Ok(builder.body(Bytes::new())?)
}

pub(crate) async fn from_websys_response(response: web_sys::Response) -> Result<Response> {
    let mut builder = http::Response::builder().status(status_of(&response)?);
    if let Some(headers) = builder.headers_mut() {
        *headers = collect_headers(&response.headers())?;
    }
    let body = array_buffer(response.array_buffer()?).await?;
    Ok(builder.body(body)?)
}

pub(crate) fn into_websys_response(response: Response) -> Result<web_sys::Response> {
    let status = response.status();
    let init = web_sys::ResponseInit::new();
    init.set_status(status.as_u16());
    init.set_headers(&into_websys_headers(response.headers())?);
    let mut body = response.into_body().to_vec();
    let body = body_allowed(status).then_some(body.as_mut_slice());
    Ok(web_sys::Response::new_with_opt_u8_array_and_init(body, &init)?)
}

async fn array_buffer(promise: Promise) -> Result<Bytes> {
    let buffer = resolve(promise).await?;
    Ok(Bytes::from(Uint8Array::new(&buffer).to_vec()))
}
