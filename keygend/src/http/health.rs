// Copyright (c) Microsoft. All rights reserved.

pub(super) struct Route;

#[async_trait::async_trait]
impl http_common::server::Route for Route {
    type ApiVersion = keygen_common_http::ApiVersion;
    fn api_version() -> std::ops::Range<Self::ApiVersion> {
        (keygen_common_http::ApiVersion::V2025_07_01)..(keygen_common_http::ApiVersion::Max)
    }

    type Server = super::Service;
    fn from_uri(
        _server: &Self::Server,
        path: &str,
        _query: &[(std::borrow::Cow<'_, str>, std::borrow::Cow<'_, str>)],
    ) -> Option<Self> {
        if path != "/health" {
            return None;
        }

        Some(Route)
    }

    type GetResponse = keygen_common_http::health::Response;
    async fn get(self) -> http_common::server::RouteResponse<Self::GetResponse> {
        let res = keygen_common_http::health::Response {
            status: "healthy".into(),
        };
        Ok((hyper::StatusCode::OK, res))
    }

    type PostBody = serde::de::IgnoredAny;
    type PostResponse = ();
}
