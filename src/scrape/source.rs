//! Rust source indexing.
//!
//! Every `.rs` file under the root is parsed with `syn`. Inherent `impl`
//! blocks contribute method docs keyed by `Object.method`; named-field structs
//! contribute their serialized shape. `use` items resolve where request and
//! response types come from.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Expr, ExprLit, Field, Fields, FnArg, GenericArgument, ImplItem, Item, ItemStruct,
    Lit, Meta, PathArguments, ReturnType, Token, Type, UseTree,
};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::docs::{FieldInfo, StructInfo};
use crate::routing::route::{RouteSource, RouteSpec};
use crate::scrape::annotations::parse_doc;
use crate::scrape::{ParamInfo, ScrapeError};

/// What the source says about one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDoc {
    pub object: String,
    pub method: String,
    /// Doc comment lines, trimmed.
    pub doc: Vec<String>,
    /// Parameters after the receiver.
    pub param_count: usize,
    /// `@Router` routes; empty when the method has none.
    pub routes: Vec<RouteSpec>,
    pub note: Option<String>,
    /// Second parameter type.
    pub request: Option<ParamInfo>,
    /// `Ok` type of a `Result` return.
    pub response: Option<ParamInfo>,
    pub file: PathBuf,
}

#[derive(Debug)]
struct IndexedStruct {
    module: String,
    info: StructInfo,
}

/// Index of route metadata and struct shapes under one source root.
#[derive(Debug, Default)]
pub struct SourceScraper {
    root: PathBuf,
    files: usize,
    methods: BTreeMap<String, MethodDoc>,
    structs: BTreeMap<String, Vec<IndexedStruct>>,
}

impl SourceScraper {
    /// Index every Rust file under `root`, following symlinks.
    ///
    /// Files that cannot be read or parsed are logged and skipped.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, ScrapeError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(ScrapeError::MissingRoot(root.to_path_buf()));
        }

        let mut scraper = Self {
            root: root.to_path_buf(),
            ..Self::default()
        };

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable source entry");
                    continue;
                }
            };
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if !entry.file_type().is_file()
                || !path.extension().is_some_and(|ext| ext == "rs")
                || relative
                    .components()
                    .any(|c| c.as_os_str() == "target" || c.as_os_str() == ".git")
            {
                continue;
            }

            match scraper.index_path(path, relative) {
                Ok(()) => scraper.files += 1,
                Err(err) => warn!(error = %err, "Skipping source file"),
            }
        }

        debug!(
            root = %root.display(),
            files = scraper.files,
            methods = scraper.methods.len(),
            "Indexed source tree"
        );
        Ok(scraper)
    }

    /// Index a single in-memory source file as module `module`.
    pub fn parse_str(module: &str, source: &str) -> Result<Self, ScrapeError> {
        let path = PathBuf::from(format!("<{module}>"));
        let file = syn::parse_file(source).map_err(|source| ScrapeError::Parse {
            path: path.clone(),
            source,
        })?;

        let mut scraper = Self::default();
        scraper.index_items(&file.items, module, &path);
        scraper.files = 1;
        Ok(scraper)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of files indexed.
    pub fn files(&self) -> usize {
        self.files
    }

    pub fn method(&self, object: &str, method: &str) -> Option<&MethodDoc> {
        self.methods.get(&format!("{object}.{method}"))
    }

    /// Struct definition a request or response type refers to.
    ///
    /// With several structs of that name, the one whose module matches the
    /// resolved import path wins.
    pub fn structure(&self, param: &ParamInfo) -> Option<&StructInfo> {
        let candidates = self.structs.get(&param.type_name)?;
        let wanted = param.import_path.as_deref().unwrap_or_default();
        candidates
            .iter()
            .find(|c| local_path(&c.module, &param.type_name) == wanted)
            .or_else(|| candidates.first())
            .map(|c| &c.info)
    }

    fn index_path(&mut self, path: &Path, relative: &Path) -> Result<(), ScrapeError> {
        let source = fs::read_to_string(path).map_err(|source| ScrapeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file = syn::parse_file(&source).map_err(|source| ScrapeError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        self.index_items(&file.items, &module_path(relative), path);
        Ok(())
    }

    fn index_items(&mut self, items: &[Item], module: &str, file: &Path) {
        let mut imports = BTreeMap::new();
        for item in items {
            if let Item::Use(item) = item {
                collect_use(&item.tree, String::new(), &mut imports);
            }
        }

        for item in items {
            match item {
                Item::Impl(block) if block.trait_.is_none() => {
                    let Type::Path(self_ty) = &*block.self_ty else {
                        continue;
                    };
                    let Some(object) = self_ty.path.segments.last().map(|s| s.ident.to_string()) else {
                        continue;
                    };
                    for impl_item in &block.items {
                        if let ImplItem::Fn(function) = impl_item {
                            let doc = method_doc(&object, function, &imports, module, file);
                            let key = format!("{}.{}", doc.object, doc.method);
                            if self.methods.contains_key(&key) {
                                debug!(method = %key, "Method documented twice, keeping the first");
                                continue;
                            }
                            self.methods.insert(key, doc);
                        }
                    }
                }
                Item::Struct(item) => {
                    let info = struct_info(item);
                    self.structs
                        .entry(info.name.clone())
                        .or_default()
                        .push(IndexedStruct {
                            module: module.to_string(),
                            info,
                        });
                }
                Item::Mod(item) => {
                    if let Some((_, nested)) = &item.content {
                        let name = unraw(&item.ident.to_string());
                        let nested_module = if module.is_empty() {
                            name
                        } else {
                            format!("{module}::{name}")
                        };
                        self.index_items(nested, &nested_module, file);
                    }
                }
                _ => {}
            }
        }
    }
}

fn method_doc(
    object: &str,
    function: &syn::ImplItemFn,
    imports: &BTreeMap<String, String>,
    module: &str,
    file: &Path,
) -> MethodDoc {
    let method = unraw(&function.sig.ident.to_string());
    let params: Vec<&Type> = function
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(typed) => Some(&*typed.ty),
            FnArg::Receiver(_) => None,
        })
        .collect();

    let request = params
        .get(1)
        .and_then(|ty| param_info(ty, imports, module));
    let response = match &function.sig.output {
        ReturnType::Type(_, ty) => result_ok(ty).and_then(|ty| param_info(ty, imports, module)),
        ReturnType::Default => None,
    };

    let doc = doc_lines(&function.attrs);
    let parsed = parse_doc(doc.iter().map(String::as_str), &method);

    MethodDoc {
        object: object.to_string(),
        method,
        doc,
        param_count: params.len(),
        routes: parsed.routes,
        note: parsed.note,
        request,
        response,
        file: file.to_path_buf(),
    }
}

impl RouteSource for SourceScraper {
    fn lookup(&self, object: &str, method: &str) -> Option<Vec<RouteSpec>> {
        self.method(object, method)
            .filter(|doc| !doc.routes.is_empty())
            .map(|doc| doc.routes.clone())
    }
}

/// `src/users/mod.rs` → `users`, `src/users/admin.rs` → `users::admin`.
fn module_path(relative: &Path) -> String {
    let mut segments: Vec<String> = relative
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if segments.first().is_some_and(|s| s == "src") {
        segments.remove(0);
    }
    if segments
        .last()
        .is_some_and(|s| matches!(s.as_str(), "mod" | "lib" | "main"))
    {
        segments.pop();
    }
    segments.join("::")
}

fn local_path(module: &str, name: &str) -> String {
    if module.is_empty() {
        format!("crate::{name}")
    } else {
        format!("crate::{module}::{name}")
    }
}

fn unraw(ident: &str) -> String {
    ident.strip_prefix("r#").unwrap_or(ident).to_string()
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}::{segment}")
    }
}

/// Flatten a `use` tree into `local name → full path`.
fn collect_use(tree: &UseTree, prefix: String, out: &mut BTreeMap<String, String>) {
    match tree {
        UseTree::Path(path) => collect_use(&path.tree, join(&prefix, &path.ident.to_string()), out),
        UseTree::Name(name) => {
            let name = name.ident.to_string();
            if name == "self" {
                if let Some(last) = prefix.rsplit("::").next() {
                    out.insert(last.to_string(), prefix.clone());
                }
            } else {
                out.insert(name.clone(), join(&prefix, &name));
            }
        }
        UseTree::Rename(rename) => {
            out.insert(
                rename.rename.to_string(),
                join(&prefix, &rename.ident.to_string()),
            );
        }
        UseTree::Group(group) => {
            for item in &group.items {
                collect_use(item, prefix.clone(), out);
            }
        }
        UseTree::Glob(_) => {}
    }
}

fn param_info(ty: &Type, imports: &BTreeMap<String, String>, module: &str) -> Option<ParamInfo> {
    match ty {
        Type::Reference(reference) => param_info(&reference.elem, imports, module),
        Type::Paren(paren) => param_info(&paren.elem, imports, module),
        Type::Path(path) if path.qself.is_none() => {
            let segments: Vec<String> = path
                .path
                .segments
                .iter()
                .map(|s| s.ident.to_string())
                .collect();
            let (type_name, qualifiers) = segments.split_last()?;

            let (package, import_path) = match qualifiers.split_first() {
                Some((first, rest)) => {
                    let mut full = vec![imports.get(first).cloned().unwrap_or_else(|| first.clone())];
                    full.extend(rest.iter().cloned());
                    full.push(type_name.clone());
                    (Some(qualifiers.join("::")), full.join("::"))
                }
                None => (
                    None,
                    imports
                        .get(type_name)
                        .cloned()
                        .unwrap_or_else(|| local_path(module, type_name)),
                ),
            };

            Some(ParamInfo {
                type_name: type_name.clone(),
                package,
                import_path: Some(import_path),
            })
        }
        _ => None,
    }
}

/// `T` of `Result<T, E>`.
fn result_ok(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let last = path.path.segments.last()?;
    if last.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => string_lit(&nv.value),
            _ => None,
        })
        .flat_map(|text| {
            text.lines()
                .map(|line| line.trim().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

fn joined_doc(attrs: &[Attribute]) -> Option<String> {
    let text = doc_lines(attrs)
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

fn string_lit(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Some(s.value()),
        _ => None,
    }
}

fn serde_metas(attrs: &[Attribute]) -> Vec<Meta> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("serde"))
        .filter_map(|attr| {
            attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
                .ok()
        })
        .flatten()
        .collect()
}

fn serde_string(metas: &[Meta], key: &str) -> Option<String> {
    metas.iter().find_map(|meta| match meta {
        Meta::NameValue(nv) if nv.path.is_ident(key) => string_lit(&nv.value),
        _ => None,
    })
}

fn serde_flag(metas: &[Meta], key: &str) -> bool {
    metas.iter().any(|meta| meta.path().is_ident(key))
}

fn rename_field(ident: &str, rule: Option<&str>) -> String {
    match rule {
        Some("lowercase") => ident.to_lowercase(),
        Some("UPPERCASE") => ident.to_uppercase(),
        Some("camelCase") => ident.to_lower_camel_case(),
        Some("PascalCase") => ident.to_upper_camel_case(),
        Some("snake_case") => ident.to_snake_case(),
        Some("SCREAMING_SNAKE_CASE") => ident.to_shouty_snake_case(),
        Some("kebab-case") => ident.to_kebab_case(),
        Some("SCREAMING-KEBAB-CASE") => ident.to_shouty_kebab_case(),
        _ => ident.to_string(),
    }
}

fn struct_info(item: &ItemStruct) -> StructInfo {
    let container = serde_metas(&item.attrs);
    let rename_all = serde_string(&container, "rename_all");
    let container_default = serde_flag(&container, "default");

    let fields = match &item.fields {
        Fields::Named(named) => named
            .named
            .iter()
            .filter_map(|field| field_info(field, rename_all.as_deref(), container_default))
            .collect(),
        _ => Vec::new(),
    };

    StructInfo {
        name: item.ident.to_string(),
        doc: joined_doc(&item.attrs),
        fields,
    }
}

fn field_info(field: &Field, rename_all: Option<&str>, container_default: bool) -> Option<FieldInfo> {
    let ident = unraw(&field.ident.as_ref()?.to_string());
    let serde = serde_metas(&field.attrs);
    if serde_flag(&serde, "skip") || serde_flag(&serde, "skip_deserializing") {
        return None;
    }

    Some(FieldInfo {
        name: serde_string(&serde, "rename").unwrap_or_else(|| rename_field(&ident, rename_all)),
        rust_type: type_string(&field.ty),
        doc: joined_doc(&field.attrs),
        required: !container_default && !serde_flag(&serde, "default") && !is_option(&field.ty),
    })
}

fn is_option(ty: &Type) -> bool {
    matches!(ty, Type::Path(path) if path.path.segments.last().is_some_and(|s| s.ident == "Option"))
}

/// Render a type the way it is usually written.
fn type_string(ty: &Type) -> String {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .iter()
            .map(|segment| {
                let mut out = segment.ident.to_string();
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    let inner: Vec<String> = args
                        .args
                        .iter()
                        .map(|arg| match arg {
                            GenericArgument::Type(ty) => type_string(ty),
                            GenericArgument::Lifetime(lifetime) => format!("'{}", lifetime.ident),
                            _ => "_".to_string(),
                        })
                        .collect();
                    out.push('<');
                    out.push_str(&inner.join(", "));
                    out.push('>');
                }
                out
            })
            .collect::<Vec<_>>()
            .join("::"),
        Type::Reference(reference) => format!(
            "&{}{}",
            if reference.mutability.is_some() { "mut " } else { "" },
            type_string(&reference.elem)
        ),
        Type::Slice(slice) => format!("[{}]", type_string(&slice.elem)),
        Type::Array(array) => format!("[{}; _]", type_string(&array.elem)),
        Type::Tuple(tuple) => format!(
            "({})",
            tuple.elems.iter().map(type_string).collect::<Vec<_>>().join(", ")
        ),
        Type::Paren(paren) => type_string(&paren.elem),
        _ => "_".to_string(),
    }
}
