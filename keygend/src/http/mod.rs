// Copyright (c) Microsoft. All rights reserved.

mod health;
mod passphrase;
mod pgpkey;
mod rsakey;
mod sshkey;

#[derive(Clone)]
pub struct Service {
    pub(crate) api: std::sync::Arc<crate::Api>,
}

http_common::make_server! {
    server: Service,
    api_version: keygen_common_http::ApiVersion,
    routes: [
        health::Route,
        passphrase::Route,
        pgpkey::Route,
        rsakey::Route,
        sshkey::Route,
    ],
}

fn to_http_error(err: &crate::Error) -> http_common::server::Error {
    match err {
        crate::Error::Internal(inner) => {
            // Full detail stays server-side; the response carries only the
            // generic category message.
            log::error!("{}", http_common::server::error_to_message(err));

            http_common::server::Error {
                status_code: hyper::StatusCode::INTERNAL_SERVER_ERROR,
                code: match inner {
                    crate::InternalError::GenerateKey(_)
                    | crate::InternalError::GenerateRandom(_)
                    | crate::InternalError::GpgExport(_)
                    | crate::InternalError::GpgGenerate(_)
                    | crate::InternalError::GpgUnavailable(_) => "key_generation",

                    crate::InternalError::CreateGpgHomedir(_)
                    | crate::InternalError::CreateStorageRoot(_) => "internal_error",
                }
                .into(),
                message: err.to_string().into(),
            }
        }

        err @ crate::Error::InvalidParameter(_, _) => http_common::server::Error {
            status_code: hyper::StatusCode::BAD_REQUEST,
            code: "invalid_parameter".into(),
            message: http_common::server::error_to_message(err).into(),
        },

        crate::Error::InvalidPath(path) => {
            log::warn!("rejected request with invalid storage path {:?}", path);

            http_common::server::Error {
                status_code: hyper::StatusCode::BAD_REQUEST,
                code: "invalid_path".into(),
                message: "key storage path is invalid".into(),
            }
        }
    }
}

fn missing_body() -> http_common::server::Error {
    http_common::server::Error {
        status_code: hyper::StatusCode::BAD_REQUEST,
        code: "invalid_request".into(),
        message: "missing request body".into(),
    }
}

type StoredPaths = (Option<String>, Option<String>, Option<String>);

/// Splits a save outcome into the `(directory, privatePath, publicPath)`
/// response fields and the envelope warning.
fn stored_paths(outcome: crate::SaveOutcome) -> (StoredPaths, Option<&'static str>) {
    match outcome {
        crate::SaveOutcome::Saved(stored) => (
            (
                Some(stored.directory.display().to_string()),
                Some(stored.private_path.display().to_string()),
                Some(stored.public_path.display().to_string()),
            ),
            None,
        ),
        crate::SaveOutcome::Failed(warning) => ((None, None, None), Some(warning)),
    }
}

fn envelope<TData>(
    data: TData,
    warning: Option<&'static str>,
) -> keygen_common_http::Envelope<TData> {
    match warning {
        Some(warning) => keygen_common_http::Envelope::with_warning(data, warning),
        None => keygen_common_http::Envelope::new(data),
    }
}
