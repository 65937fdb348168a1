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
        if path != "/rsakey" {
            return None;
        }

        Some(Route {
            api: server.api.clone(),
        })
    }

    type GetResponse = ();

    type PostBody = keygen_common_http::generate_rsa_key::Request;
    type PostResponse =
        keygen_common_http::Envelope<keygen_common_http::generate_rsa_key::Response>;
    async fn post(
        self,
        body: Option<Self::PostBody>,
    ) -> http_common::server::RouteResponse<Option<Self::PostResponse>> {
        let body = body.ok_or_else(super::missing_body)?;

        let (key_pair, outcome) = self
            .api
            .generate_rsa_key(body.key_size, body.comment, body.passphrase)
            .map_err(|err| super::to_http_error(&err))?;

        let ((directory, private_path, public_path), warning) = super::stored_paths(outcome);
        let res = keygen_common_http::generate_rsa_key::Response {
            private_key: key_pair.private_key,
            public_key: key_pair.public_key,
            key_size: key_pair.key_size,
            directory,
            private_path,
            public_path,
        };
        let res = super::envelope(res, warning);
        Ok((hyper::StatusCode::OK, Some(res)))
    }
}
