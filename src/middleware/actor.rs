// src/middleware/actor.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::{
    common::error::ApiError,
    models::actor::{Actor, Role},
};

// A autenticação fica no gateway; aqui só lemos o que ele repassa
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Usuário da requisição. Sem cabeçalho, é um usuário não identificado.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Actor);

fn header_str<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|s| Some(s.trim()).filter(|s| !s.is_empty()))
            .map_err(|_| {
                ApiError::new(
                    StatusCode::BAD_REQUEST,
                    format!("Cabeçalho {name} contém caracteres inválidos."),
                )
            }),
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let username = header_str(parts, USER_NAME_HEADER)?.map(str::to_string);

        let role = match header_str(parts, USER_ROLE_HEADER)? {
            Some(role) if role.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Member,
        };

        Ok(CurrentUser(Actor { username, role }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<Actor, ApiError> {
        let (mut parts, _) = request.into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await.map(|user| user.0)
    }

    #[tokio::test]
    async fn reads_name_and_role_headers() {
        let request = Request::builder()
            .header(USER_NAME_HEADER, "chefe")
            .header(USER_ROLE_HEADER, "ADMIN")
            .body(())
            .unwrap();

        let actor = extract(request).await.unwrap();

        assert_eq!(actor.username.as_deref(), Some("chefe"));
        assert!(actor.is_admin());
    }

    #[tokio::test]
    async fn missing_or_blank_headers_mean_unidentified_member() {
        let request = Request::builder()
            .header(USER_NAME_HEADER, "   ")
            .body(())
            .unwrap();

        let actor = extract(request).await.unwrap();

        assert_eq!(actor, Actor::anonymous());
        assert_eq!(actor.display_name(), "Usuário não identificado");
    }
}
