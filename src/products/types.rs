//! Product types and creation-time validation.
//!
//! Validation is deliberately loose: `name`, `type` and `brand` must be
//! truthy (present, not `null`, `false`, `0` or `""`) and `price` must be
//! present and not `null`. Any other submitted field is kept and echoed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, FieldError};

/// Fields assigned by the server; a submitted value never overrides them.
pub const RESERVED_FIELDS: [&str; 4] = ["id", "createdAt", "updatedAt", "requestId"];

/// A stored product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: Value,
    #[serde(rename = "type")]
    pub kind: Value,
    pub brand: Value,
    pub price: Value,
    /// Extra submitted fields, echoed as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields a client submits to create a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: Value,
    #[serde(rename = "type")]
    pub kind: Value,
    pub brand: Value,
    pub price: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewProduct {
    pub fn new(
        name: impl Into<Value>,
        kind: impl Into<Value>,
        brand: impl Into<Value>,
        price: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            brand: brand.into(),
            price: price.into(),
            extra: Map::new(),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn required(
    body: &mut Map<String, Value>,
    field: &str,
    message: &str,
    accept: fn(&Value) -> bool,
    errors: &mut Vec<FieldError>,
) -> Value {
    match body.remove(field) {
        Some(value) if accept(&value) => value,
        _ => {
            errors.push(FieldError::new(field, message));
            Value::Null
        }
    }
}

/// Validate a raw JSON body into a [`NewProduct`].
///
/// Anything that is not a JSON object is treated as `{}`, so every field is
/// reported.
pub fn validate_new_product(raw: &[u8]) -> Result<NewProduct, ApiError> {
    let mut body = match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let mut errors = Vec::new();
    let name = required(&mut body, "name", "Name is required", is_truthy, &mut errors);
    let kind = required(&mut body, "type", "Type is required", is_truthy, &mut errors);
    let brand = required(&mut body, "brand", "Brand is required", is_truthy, &mut errors);
    let price = required(&mut body, "price", "Price is required", |v| !v.is_null(), &mut errors);

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    for field in RESERVED_FIELDS {
        body.remove(field);
    }
    Ok(NewProduct {
        name,
        kind,
        brand,
        price,
        extra: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(body: Value) -> Result<NewProduct, ApiError> {
        validate_new_product(body.to_string().as_bytes())
    }

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(details) => details.into_iter().map(|d| d.field).collect(),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_valid_product() {
        let body = json!({"name":"Mouse","type":"peripheral","brand":"Acme","price":100});
        let product = validate(body).unwrap();
        assert_eq!(product, NewProduct::new("Mouse", "peripheral", "Acme", 100));
    }

    #[test]
    fn test_empty_object_reports_all_four() {
        let err = validate_new_product(b"{}").unwrap_err();
        assert_eq!(fields(err), vec!["name", "type", "brand", "price"]);
    }

    #[test]
    fn test_non_object_bodies_treated_as_empty() {
        for raw in [&b""[..], b"not json", b"[1,2]", b"null"] {
            assert_eq!(fields(validate_new_product(raw).unwrap_err()).len(), 4);
        }
    }

    #[test]
    fn test_price_needs_only_to_be_non_null() {
        for price in [json!(0), json!("12"), json!(false), json!("")] {
            let body = json!({"name":"a","type":"b","brand":"c","price":price.clone()});
            assert_eq!(validate(body).unwrap().price, price);
        }

        let null = json!({"name":"a","type":"b","brand":"c","price":null});
        assert_eq!(fields(validate(null).unwrap_err()), vec!["price"]);
    }

    #[test]
    fn test_text_fields_need_to_be_truthy() {
        let accepted = validate(json!({"name":" ","type":7,"brand":["x"],"price":1})).unwrap();
        assert_eq!(accepted.name, " ");
        assert_eq!(accepted.kind, 7);

        let rejected = json!({"name":"","type":0,"brand":false,"price":1});
        assert_eq!(fields(validate(rejected).unwrap_err()), vec!["name", "type", "brand"]);
    }

    #[test]
    fn test_messages() {
        let body = json!({"name":"", "type":"t", "brand":"b"});
        let Err(ApiError::Validation(details)) = validate(body) else {
            panic!("expected validation error");
        };
        assert_eq!(
            details,
            vec![
                FieldError::new("name", "Name is required"),
                FieldError::new("price", "Price is required"),
            ]
        );
    }

    #[test]
    fn test_extra_fields_kept_but_server_fields_dropped() {
        let body = json!({
            "name":"Mouse","type":"peripheral","brand":"Acme","price":100,
            "color":"black","id":"p_forged","createdAt":"yesterday",
        });
        let product = validate(body).unwrap();
        assert_eq!(product.extra, json!({"color":"black"}).as_object().unwrap().clone());
    }

    #[test]
    fn test_product_wire_names() {
        let mut extra = Map::new();
        extra.insert("color".into(), json!("black"));
        let product = Product {
            id: "p_1".into(),
            name: json!("n"),
            kind: json!("k"),
            brand: json!("b"),
            price: json!(1),
            extra,
            created_at: "t".into(),
            updated_at: "t".into(),
        };
        let value = serde_json::to_value(product).unwrap();
        assert_eq!(value["type"], "k");
        assert_eq!(value["color"], "black");
        assert_eq!(value["createdAt"], "t");
        assert_eq!(value["updatedAt"], "t");
    }
}
