//! OpenAPI 3.0 rendering of an [`ApiDoc`].

use serde_json::{json, Map, Value};

use crate::docs::{ApiDoc, DocRoute, DocsError, StructInfo};

const OPENAPI_VERSION: &str = "3.0.3";

/// Verbs an `ANY` route is documented under.
const ANY_VERBS: [&str; 7] = ["get", "post", "put", "patch", "delete", "options", "head"];

pub fn render(doc: &ApiDoc) -> Result<String, DocsError> {
    let mut paths = Map::new();
    let mut schemas = Map::new();
    schemas.insert("ErrorBody".to_string(), error_schema());

    for route in &doc.routes {
        for info in [&route.request, &route.response].into_iter().flatten() {
            schemas
                .entry(info.name.clone())
                .or_insert_with(|| struct_schema(info));
        }

        let verbs = expand_verbs(route);
        let item = paths
            .entry(route.path.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(item) = item {
            for verb in &verbs {
                let operation_id = if verbs.len() > 1 {
                    format!("{}.{}.{verb}", route.object, route.method)
                } else {
                    format!("{}.{}", route.object, route.method)
                };
                item.insert(verb.clone(), operation(route, verb, operation_id));
            }
        }
    }

    let document = json!({
        "openapi": OPENAPI_VERSION,
        "info": {
            "title": doc.title,
            "version": doc.version,
        },
        "paths": paths,
        "components": { "schemas": schemas },
    });

    Ok(serde_json::to_string_pretty(&document)?)
}

fn expand_verbs(route: &DocRoute) -> Vec<String> {
    let mut verbs: Vec<String> = Vec::new();
    for verb in &route.verbs {
        let verb = verb.to_ascii_lowercase();
        let expanded: Vec<String> = if verb == "any" {
            ANY_VERBS.iter().map(|v| v.to_string()).collect()
        } else {
            vec![verb]
        };
        for verb in expanded {
            if !verbs.contains(&verb) {
                verbs.push(verb);
            }
        }
    }
    verbs
}

fn operation(route: &DocRoute, verb: &str, operation_id: String) -> Value {
    let mut op = Map::new();
    op.insert("operationId".into(), json!(operation_id));
    op.insert("tags".into(), json!([route.object]));
    if let Some(note) = &route.note {
        op.insert("summary".into(), json!(note));
    }

    let mut parameters = path_parameters(&route.path);
    if let Some(request) = &route.request {
        if matches!(verb, "get" | "head" | "delete") {
            parameters.extend(request.fields.iter().map(|field| {
                json!({
                    "name": field.name,
                    "in": "query",
                    "required": field.required,
                    "description": field.doc.clone().unwrap_or_default(),
                    "schema": type_schema(&field.rust_type),
                })
            }));
        } else {
            op.insert(
                "requestBody".into(),
                json!({
                    "required": true,
                    "content": {
                        "application/json": { "schema": schema_ref(&request.name) },
                        "application/x-www-form-urlencoded": { "schema": schema_ref(&request.name) },
                    },
                }),
            );
        }
    }
    if !parameters.is_empty() {
        op.insert("parameters".into(), Value::Array(parameters));
    }

    let success = match &route.response {
        Some(response) => json!({
            "description": "OK",
            "content": { "application/json": { "schema": schema_ref(&response.name) } },
        }),
        None => json!({ "description": "OK" }),
    };
    op.insert(
        "responses".into(),
        json!({
            "200": success,
            "400": {
                "description": "Invalid parameters or failed operation",
                "content": { "application/json": { "schema": schema_ref("ErrorBody") } },
            },
        }),
    );

    Value::Object(op)
}

fn path_parameters(path: &str) -> Vec<Value> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| name.trim_start_matches('*'))
        .map(|name| {
            json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": { "type": "string" },
            })
        })
        .collect()
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn struct_schema(info: &StructInfo) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in &info.fields {
        let mut schema = type_schema(&field.rust_type);
        if let (Some(doc), Value::Object(schema)) = (&field.doc, &mut schema) {
            schema.insert("description".into(), json!(doc));
        }
        properties.insert(field.name.clone(), schema);
        if field.required {
            required.push(json!(field.name));
        }
    }

    let mut schema = json!({ "type": "object", "properties": properties });
    if let Value::Object(map) = &mut schema {
        if !required.is_empty() {
            map.insert("required".into(), Value::Array(required));
        }
        if let Some(doc) = &info.doc {
            map.insert("description".into(), json!(doc));
        }
    }
    schema
}

fn error_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "state": { "type": "boolean" },
            "code": { "type": "integer" },
            "error": { "type": "string" },
        },
        "required": ["state", "code", "error"],
    })
}

/// JSON schema for a Rust type as written in source.
fn type_schema(rust_type: &str) -> Value {
    let ty = rust_type.trim().trim_start_matches('&').trim();
    if let Some(inner) = generic_arg(ty, "Option") {
        return type_schema(inner);
    }
    if let Some(inner) = generic_arg(ty, "Vec") {
        return json!({ "type": "array", "items": type_schema(inner) });
    }
    match ty {
        "String" | "str" | "char" => json!({ "type": "string" }),
        "bool" => json!({ "type": "boolean" }),
        "f32" | "f64" => json!({ "type": "number" }),
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64" | "u128"
        | "usize" => json!({ "type": "integer" }),
        _ => json!({ "type": "object" }),
    }
}

fn generic_arg<'a>(ty: &'a str, wrapper: &str) -> Option<&'a str> {
    let rest = ty.strip_prefix(wrapper)?.trim_start();
    rest.strip_prefix('<')?.strip_suffix('>').map(str::trim)
}
