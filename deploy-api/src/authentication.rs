use actix_web::{Error, dev::ServiceRequest, web::Data};
use actix_web_httpauth::extractors::{
    AuthenticationError,
    bearer::{BearerAuth, Config},
};
use constant_time_eq::constant_time_eq_n;

use crate::config::{ApiConfig, ApiKey};

pub async fn auth_validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let config = req
        .app_data::<Config>()
        .cloned()
        .unwrap_or_default()
        .scope("v1");

    let api_keys = &req
        .app_data::<Data<ApiConfig>>()
        .expect("missing api configuration")
        .api_keys;

    let token: ApiKey = match credentials.token().try_into() {
        Ok(token) => token,
        Err(_) => {
            return Err((AuthenticationError::from(config).into(), req));
        }
    };

    // Any configured key is valid, which allows rotation without downtime.
    for api_key in api_keys {
        if let Ok(api_key) = ApiKey::try_from(api_key.as_str()) {
            if constant_time_eq_n(&api_key.key, &token.key) {
                return Ok(req);
            }
        }
    }

    Err((AuthenticationError::from(config).into(), req))
}
