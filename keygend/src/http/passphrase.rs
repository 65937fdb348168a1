// Copyright (c) Microsoft. All rights reserved.

pub(super) struct Route {
    api: std::sync::Arc<crate::Api>,
}

#[async_trait::async_trait]
impl http_common::server::Route for Route {
    type ApiVersion = keygen_common_http::ApiVersion;
    fn api_version() -> std::ops::Range<Self::ApiVersion> {
        (keygen_common_http::ApiVersion::V2025_07_01)..(keygen_common_http::ApiVersion::Max)
    }

    type Server = super::Service;
    fn from_uri(
        server: &Self::Server,
        path: &str,
        _query: &[(std::borrow::Cow<'_, str>, std::borrow::Cow<'_, str>)],
    ) -> Option<Self> {
        if path != "/passphrase" {
            return None;
        }

        Some(Route {
            api: server.api.clone(),
        })
    }

    type GetResponse = ();

    type PostBody = keygen_common_http::generate_passphrase::Request;
    type PostResponse =
        keygen_common_http::Envelope<keygen_common_http::generate_passphrase::Response>;
    async fn post(
        self,
        body: Option<Self::PostBody>,
    ) -> http_common::server::RouteResponse<Option<Self::PostResponse>> {
        let body = body.ok_or_else(super::missing_body)?;

        let (params, passphrase) = self
            .api
            .generate_passphrase(
                body.length,
                body.include_numbers,
                body.include_special,
                body.exclude_chars,
            )
            .map_err(|err| super::to_http_error(&err))?;

        let res = keygen_common_http::generate_passphrase::Response {
            length: passphrase.len(),
            include_numbers: params.include_numbers,
            include_special: params.include_special,
            passphrase,
        };
        let res = keygen_common_http::Envelope::new(res);
        Ok((hyper::StatusCode::OK, Some(res)))
    }
}
