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
        if path != "/pgpkey" {
            return None;
        }

        Some(Route {
            api: server.api.clone(),
        })
    }

    type GetResponse = ();

    type PostBody = keygen_common_http::generate_pgp_key::Request;
    type PostResponse =
        keygen_common_http::Envelope<keygen_common_http::generate_pgp_key::Response>;
    async fn post(
        self,
        body: Option<Self::PostBody>,
    ) -> http_common::server::RouteResponse<Option<Self::PostResponse>> {
        let body = body.ok_or_else(super::missing_body)?;

        let params = crate::keygen::pgp::PgpParams {
            name: body.name,
            email: body.email,
            comment: body.comment.unwrap_or_default(),
            key_type: body.key_type.unwrap_or(keygen_common::PgpAlgorithm::Rsa),
            key_length: body.key_length,
            curve: body.curve,
            passphrase: body.passphrase,
            expire_time: body.expire_time,
        };

        let (key_pair, outcome) = self
            .api
            .generate_pgp_key(params)
            .await
            .map_err(|err| super::to_http_error(&err))?;

        let ((directory, private_path, public_path), warning) = super::stored_paths(outcome);
        let res = keygen_common_http::generate_pgp_key::Response {
            private_key: key_pair.private_key,
            public_key: key_pair.public_key,
            key_id: key_pair.key_id,
            expires_at: key_pair
                .expires_at
                .map(|expires_at| expires_at.to_rfc3339()),
            directory,
            private_path,
            public_path,
        };
        let res = super::envelope(res, warning);
        Ok((hyper::StatusCode::OK, Some(res)))
    }
}
