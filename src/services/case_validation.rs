// src/services/case_validation.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

use crate::{
    models::{actor::Actor, collection::CollectionCase},
    services::days_overdue::parse_due_date,
};

// ---
// Validações customizadas usadas pelo derive do `CollectionCase`
// ---

pub fn validate_required_text(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("O nome é obrigatório.".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_amount(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("invalid_amount");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

/// Valida o caso inteiro. Email e vencimento só são checados quando preenchidos.
pub fn validate_case(case: &CollectionCase) -> Result<(), ValidationErrors> {
    let mut errors = match case.validate() {
        Ok(()) => ValidationErrors::new(),
        Err(errors) => errors,
    };

    if let Some(email) = case.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        if !email.validate_email() {
            let mut err = ValidationError::new("invalid_email");
            err.message = Some("O e-mail fornecido é inválido.".into());
            errors.add("email", err);
        }
    }

    if let Some(due) = case.due_date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        if parse_due_date(due).is_none() {
            let mut err = ValidationError::new("invalid_date_format");
            err.message = Some("A data deve estar no formato DD/MM/YYYY.".into());
            errors.add("due_date", err);
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Achata os erros do `validator` em campo -> códigos.
pub fn error_codes(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, field_errors)| {
            let codes = field_errors.iter().map(|e| e.code.to_string()).collect();
            (field.to_string(), codes)
        })
        .collect()
}

// ---
// Permissões de edição (tela de detalhes)
// ---

/// Observações: só o criador ou um admin. Sem criador, qualquer um.
pub fn can_edit_notes(case: &CollectionCase, actor: &Actor) -> bool {
    match case.created_by.as_deref() {
        None => true,
        Some(creator) => actor.is_admin() || actor.is(creator),
    }
}

/// Dados básicos: admin, sem criador, o próprio criador, ou operador sem nome.
pub fn can_edit_details(case: &CollectionCase, actor: &Actor) -> bool {
    actor.is_admin()
        || actor.username.is_none()
        || match case.created_by.as_deref() {
            None => true,
            Some(creator) => actor.is(creator),
        }
}

/// Diz se a edição mexe nos dados básicos do caso.
pub fn details_changed(before: &CollectionCase, after: &CollectionCase) -> bool {
    before.display_name != after.display_name
        || before.amount != after.amount
        || before.due_date != after.due_date
        || before.course != after.course
        || before.email != after.email
        || before.phone != after.phone
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actor::Role;

    fn case() -> CollectionCase {
        let mut case = CollectionCase::new("1", "Ana Souza", "2025-01");
        case.amount = Decimal::new(35000, 2);
        case
    }

    #[test]
    fn valid_case_passes() {
        let mut case = case();
        case.email = Some("ana@example.com".into());
        case.due_date = Some("10/01/2025".into());
        assert!(validate_case(&case).is_ok());
    }

    #[test]
    fn blank_optional_fields_are_not_validated() {
        let mut case = case();
        case.email = Some("  ".into());
        case.due_date = Some(String::new());
        assert!(validate_case(&case).is_ok());
    }

    #[test]
    fn collects_every_invalid_field() {
        let mut case = case();
        case.display_name = "   ".into();
        case.amount = Decimal::new(-1, 0);
        case.email = Some("not-an-email".into());
        case.due_date = Some("31/02/2025".into());

        let errors = validate_case(&case).unwrap_err();
        let codes = error_codes(&errors);

        assert_eq!(codes["display_name"], vec!["required".to_string()]);
        assert_eq!(codes["amount"], vec!["invalid_amount".to_string()]);
        assert_eq!(codes["email"], vec!["invalid_email".to_string()]);
        assert_eq!(codes["due_date"], vec!["invalid_date_format".to_string()]);
    }

    #[test]
    fn notes_belong_to_creator_or_admin() {
        let mut case = case();
        let owner = Actor::new("maria", Role::Member);
        let other = Actor::new("joao", Role::Member);
        let admin = Actor::new("chefe", Role::Admin);

        assert!(can_edit_notes(&case, &other));

        case.created_by = Some("maria".into());
        assert!(can_edit_notes(&case, &owner));
        assert!(can_edit_notes(&case, &admin));
        assert!(!can_edit_notes(&case, &other));
        assert!(!can_edit_notes(&case, &Actor::anonymous()));
    }

    #[test]
    fn details_open_to_unnamed_operator() {
        let mut case = case();
        case.created_by = Some("maria".into());

        assert!(can_edit_details(&case, &Actor::anonymous()));
        assert!(can_edit_details(&case, &Actor::new("maria", Role::Member)));
        assert!(!can_edit_details(&case, &Actor::new("joao", Role::Member)));
    }
}
