//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! compartidas entre el ingest y la API.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    // Matrículas vietnamitas tipo "51H-12345" o "51H-123.45"; solo informativo,
    // los dispositivos reales reportan variantes que igualmente se aceptan
    static ref PLATE_REGEX: Regex = Regex::new(r"^\d{2}[A-Z]{1,2}-\d{3,5}(\.\d{2})?$").unwrap();
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Verificar si una matrícula tiene el formato estándar.
/// No es un rechazo: cualquier matrícula no vacía es válida como clave,
/// esto solo alimenta el log de observabilidad del ingest.
pub fn is_standard_plate(plate: &str) -> bool {
    PLATE_REGEX.is_match(plate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_rejected() {
        assert!(validate_not_empty("").is_err());
        assert!(validate_not_empty("   ").is_err());
        assert!(validate_not_empty("51H-12345").is_ok());
    }

    #[test]
    fn standard_plates_match() {
        assert!(is_standard_plate("51H-12345"));
        assert!(is_standard_plate("29AB-123.45"));
        assert!(!is_standard_plate("DEVICE-01"));
        assert!(!is_standard_plate(""));
    }
}
