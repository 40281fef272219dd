//! Markdown rendering of an [`ApiDoc`].

use crate::docs::{ApiDoc, DocRoute, StructInfo};

pub fn render(doc: &ApiDoc) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", doc.title));
    out.push_str(&format!("Version `{}`, group `{}`\n\n", doc.version, doc.group));

    out.push_str("## Routes\n\n");
    out.push_str("| Verbs | Path | Handler |\n|---|---|---|\n");
    for route in &doc.routes {
        out.push_str(&format!(
            "| {} | `{}` | `{}.{}` |\n",
            verbs(route),
            route.path,
            route.object,
            route.method
        ));
    }

    for route in &doc.routes {
        out.push_str(&format!("\n## {}.{}\n\n", route.object, route.method));
        out.push_str(&format!("`{}` `{}`\n", verbs(route), route.path));
        if let Some(note) = &route.note {
            out.push_str(&format!("\n{note}\n"));
        }
        if let Some(request) = &route.request {
            render_struct(&mut out, "Request", request);
        }
        if let Some(response) = &route.response {
            render_struct(&mut out, "Response", response);
        }
    }

    out
}

fn verbs(route: &DocRoute) -> String {
    route
        .verbs
        .iter()
        .map(|verb| verb.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_struct(out: &mut String, heading: &str, info: &StructInfo) {
    out.push_str(&format!("\n### {heading}: {}\n\n", info.name));
    if let Some(doc) = &info.doc {
        out.push_str(&format!("{doc}\n\n"));
    }
    out.push_str("| Field | Type | Required | Description |\n|---|---|---|---|\n");
    for field in &info.fields {
        out.push_str(&format!(
            "| {} | `{}` | {} | {} |\n",
            field.name,
            field.rust_type,
            if field.required { "yes" } else { "no" },
            field.doc.as_deref().unwrap_or("")
        ));
    }
}
