// Copyright (c) Microsoft. All rights reserved.

/// Implements `hyper::service::Service` for the given server type by
/// dispatching requests to the listed [`Route`]s.
///
/// Every request must carry an `api-version` query parameter that falls in
/// the route's supported range.
#[macro_export]
macro_rules! make_server {
    (
        server: $server_ty:ty,
        api_version: $api_version_ty:ty,
        routes: [
            $($route:path ,)*
        ],
    ) => {
        impl hyper::service::Service<hyper::Request<hyper::Body>> for $server_ty {
            type Response = hyper::Response<hyper::Body>;
            type Error = std::convert::Infallible;
            type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

            fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
                std::task::Poll::Ready(Ok(()))
            }

            fn call(&mut self, req: hyper::Request<hyper::Body>) -> Self::Future {
                fn call_inner(
                    this: &mut $server_ty,
                    req: hyper::Request<hyper::Body>,
                ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<hyper::Response<hyper::Body>, std::convert::Infallible>> + Send>> {
                    let (http::request::Parts { method, uri, headers, .. }, body) = req.into_parts();

                    let path = uri.path();

                    let (api_version, query_params) = {
                        let mut api_version = None;
                        let mut query_params = vec![];

                        if let Some(query) = uri.query() {
                            for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
                                if name == "api-version" {
                                    api_version = Some(value);
                                }
                                else {
                                    query_params.push((name, value));
                                }
                            }
                        }

                        let api_version = match api_version {
                            Some(api_version) => api_version,
                            None => return Box::pin(futures_util::future::ok((http_common::server::Error {
                                status_code: http::StatusCode::BAD_REQUEST,
                                code: "invalid_request".into(),
                                message: "api-version not specified".into(),
                            }).to_http_response())),
                        };
                        let api_version: $api_version_ty = match api_version.parse() {
                            Ok(api_version) => api_version,
                            Err(()) => return Box::pin(futures_util::future::ok((http_common::server::Error {
                                status_code: http::StatusCode::BAD_REQUEST,
                                code: "invalid_request".into(),
                                message: format!("invalid api-version {:?}", api_version).into(),
                            }).to_http_response())),
                        };
                        (api_version, query_params)
                    };

                    $(
                        let route_api_version_matches = <$route as http_common::server::Route>::api_version().contains(&api_version);
                        if route_api_version_matches {
                            let route: Option<$route> = http_common::server::Route::from_uri(&*this, path, &query_params);
                            if let Some(route) = route {
                                return Box::pin(async move {
                                    let response = match method {
                                        http::Method::GET => {
                                            let (status_code, response) = match <$route as http_common::server::Route>::get(route).await {
                                                Ok(result) => result,
                                                Err(err) => return Ok(err.to_http_response()),
                                            };
                                            http_common::server::json_response(status_code, Some(&response))
                                        },

                                        http::Method::POST => {
                                            let body = {
                                                let content_type = headers.get(hyper::header::CONTENT_TYPE).and_then(|value| value.to_str().ok());
                                                if content_type.map_or(false, |content_type| content_type.starts_with("application/json")) {
                                                    let body = match hyper::body::to_bytes(body).await {
                                                        Ok(body) => body,
                                                        Err(err) => return Ok((http_common::server::Error {
                                                            status_code: http::StatusCode::BAD_REQUEST,
                                                            code: "invalid_request".into(),
                                                            message: http_common::server::error_to_message(&err).into(),
                                                        }).to_http_response()),
                                                    };

                                                    let body: <$route as http_common::server::Route>::PostBody = match serde_json::from_slice(&body) {
                                                        Ok(body) => body,
                                                        Err(err) => return Ok((http_common::server::Error {
                                                            status_code: http::StatusCode::UNPROCESSABLE_ENTITY,
                                                            code: "invalid_request".into(),
                                                            message: http_common::server::error_to_message(&err).into(),
                                                        }).to_http_response()),
                                                    };

                                                    Some(body)
                                                }
                                                else {
                                                    None
                                                }
                                            };

                                            let (status_code, response) = match <$route as http_common::server::Route>::post(route, body).await {
                                                Ok(result) => result,
                                                Err(err) => return Ok(err.to_http_response()),
                                            };
                                            http_common::server::json_response(status_code, response.as_ref())
                                        },

                                        _ => return Ok((http_common::server::Error {
                                            status_code: http::StatusCode::METHOD_NOT_ALLOWED,
                                            code: "invalid_request".into(),
                                            message: "method not allowed".into(),
                                        }).to_http_response()),
                                    };
                                    Ok(response)
                                })
                            }
                        }
                    )*

                    let res = (http_common::server::Error {
                        status_code: http::StatusCode::NOT_FOUND,
                        code: "not_found".into(),
                        message: "not found".into(),
                    }).to_http_response();
                    Box::pin(futures_util::future::ok(res))
                }

                log::debug!("<-- {:?} {:?}", req.method(), req.uri());
                let res = call_inner(self, req);
                Box::pin(async move {
                    let res = res.await;
                    match &res {
                        Ok(res) => log::debug!("--> {:?}", res.status()),
                        Err(err) => log::debug!("-!> {:?}", err),
                    }
                    res
                })
            }
        }
    };
}

// DEVNOTE: Set the *Body assoc type to `serde::de::IgnoredAny` if the corresponding method isn't overridden.
#[async_trait::async_trait]
pub trait Route: Sized {
    type ApiVersion: std::cmp::PartialOrd;
    fn api_version() -> std::ops::Range<Self::ApiVersion>;

    type Server;
    fn from_uri(
        server: &Self::Server,
        path: &str,
        query: &[(std::borrow::Cow<'_, str>, std::borrow::Cow<'_, str>)],
    ) -> Option<Self>;

    type GetResponse: serde::Serialize + Send + 'static;
    async fn get(self) -> RouteResponse<Self::GetResponse> {
        Err(Error {
            status_code: http::StatusCode::METHOD_NOT_ALLOWED,
            code: "invalid_request".into(),
            message: "method not allowed".into(),
        })
    }

    type PostBody: serde::de::DeserializeOwned + Send;
    type PostResponse: serde::Serialize + Send + 'static;
    async fn post(self, _body: Option<Self::PostBody>) -> RouteResponse<Option<Self::PostResponse>> {
        Err(Error {
            status_code: http::StatusCode::METHOD_NOT_ALLOWED,
            code: "invalid_request".into(),
            message: "method not allowed".into(),
        })
    }
}

pub type RouteResponse<T> = Result<(http::StatusCode, T), Error>;

/// An error response, serialized as
/// `{"success": false, "error": {"type": ..., "message": ...}}`.
///
/// `code` is a fixed taxonomy value; `message` must never carry internal
/// detail for 5xx responses.
#[derive(Debug)]
pub struct Error {
    pub status_code: http::StatusCode,
    pub code: std::borrow::Cow<'static, str>,
    pub message: std::borrow::Cow<'static, str>,
}

impl Error {
    pub fn to_http_response(&self) -> hyper::Response<hyper::Body> {
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: std::borrow::Cow::Borrowed(&*self.code),
                message: std::borrow::Cow::Borrowed(&*self.message),
            },
        };
        let res = json_response(self.status_code, Some(&body));
        res
    }
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct ErrorBody<'a> {
    pub success: bool,
    pub error: ErrorDetail<'a>,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct ErrorDetail<'a> {
    #[serde(rename = "type")]
    pub code: std::borrow::Cow<'a, str>,
    pub message: std::borrow::Cow<'a, str>,
}

pub fn error_to_message(err: &impl std::error::Error) -> String {
    let mut message = String::new();

    message.push_str(&err.to_string());

    let mut source = err.source();
    while let Some(err) = source {
        message.push_str("\ncaused by: ");
        message.push_str(&err.to_string());
        source = err.source();
    }

    message
}

pub fn json_response(
    status_code: http::StatusCode,
    body: Option<&impl serde::Serialize>,
) -> hyper::Response<hyper::Body> {
    let res = hyper::Response::builder().status(status_code);
    let res = if let Some(body) = body {
        let body = serde_json::to_string(body).expect("cannot fail to serialize response to JSON");
        let body = hyper::Body::from(body);
        res.header(hyper::header::CONTENT_TYPE, "application/json")
            .body(body)
    } else {
        res.body(Default::default())
    };
    let res = res.expect("cannot fail to build hyper response");
    res
}
