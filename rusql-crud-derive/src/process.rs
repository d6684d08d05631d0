use deluxe::ExtractAttributes;
use proc_macro2::TokenStream;
use quote::quote;

pub struct Output {
    /// `("column", ColumnType::X)` entries of the allow-list.
    pub columns: Vec<TokenStream>,
    /// `values.insert(...)` statements for `to_values`.
    pub value_inserts: Vec<TokenStream>,
}

#[derive(ExtractAttributes, Default, Debug)]
#[deluxe(attributes(field))]
struct ModelField {
    /// Leave the field out of writes (e.g. an auto-increment id).
    skip: Option<bool>,
    /// Column name when it differs from the field name.
    column: Option<String>,
    /// Declared type name overriding the one inferred from the Rust type.
    ty: Option<String>,
}

pub fn process_fields(fields: &syn::punctuated::Punctuated<syn::Field, syn::Token![,]>) -> Output {
    let mut columns = Vec::new();
    let mut value_inserts = Vec::new();

    for field in fields {
        let attributes = ModelField::extract_attributes(&mut field.clone()).unwrap_or_default();
        if attributes.skip.unwrap_or(false) {
            continue;
        }

        let field_name = field.ident.as_ref().unwrap();
        let column = attributes
            .column
            .clone()
            .unwrap_or_else(|| field_name.to_string());

        let column_type = match &attributes.ty {
            Some(ty) => column_type_from_name(ty),
            None => column_type_from_rust(&extract_inner_type(&field.ty)),
        };

        columns.push(quote! { (#column, rusql_crud::ColumnType::#column_type) });
        value_inserts.push(quote! {
            values.insert(
                #column.to_string(),
                rusql_crud::serde_json::Value::from(::std::clone::Clone::clone(&self.#field_name)),
            );
        });
    }

    Output {
        columns,
        value_inserts,
    }
}

fn column_type_from_rust(inner_type: &str) -> syn::Ident {
    let variant = match inner_type {
        "Integer" | "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" => "Int",
        "Float" | "f32" | "f64" => "Float",
        "String" => "String",
        "Text" => "Text",
        "Boolean" | "bool" => "Bool",
        "Date" => "Date",
        "DateTime" => "DateTime",
        other => panic!(
            "Unsupported type: {}, only integers, floats, 'bool', 'String' and the 'Integer' 'Float' 'Text' 'Boolean' 'Date' 'DateTime' aliases are available!",
            other
        ),
    };
    syn::Ident::new(variant, proc_macro2::Span::call_site())
}

fn column_type_from_name(name: &str) -> syn::Ident {
    let variant = match name.to_ascii_lowercase().as_str() {
        "int" | "integer" => "Int",
        "float" | "double" => "Float",
        "string" | "varchar" => "String",
        "text" => "Text",
        "bool" | "boolean" => "Bool",
        "date" => "Date",
        "datetime" | "timestamp" => "DateTime",
        other => panic!("Unknown column type '{}' in #[field(ty = ...)]", other),
    };
    syn::Ident::new(variant, proc_macro2::Span::call_site())
}

fn extract_inner_type(field_type: &syn::Type) -> String {
    if let syn::Type::Path(type_path) = field_type {
        if let Some(path_segment) = type_path.path.segments.last() {
            if path_segment.ident == "Option" {
                if let syn::PathArguments::AngleBracketed(args) = &path_segment.arguments {
                    if let Some(syn::GenericArgument::Type(inner_type)) = args.args.first() {
                        return extract_inner_type(inner_type);
                    }
                }
            }
            return path_segment.ident.to_string();
        }
    }
    panic!("Invalid type")
}
