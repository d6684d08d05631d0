use deluxe::ExtractAttributes;
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

mod process;

#[derive(ExtractAttributes, Default, Debug)]
#[deluxe(attributes(model))]
struct ModelAttributes {
    /// Table name; defaults to the struct name.
    table: Option<String>,
}

/// Implements `rusql_crud::Model` for a struct with named fields.
///
/// Every field becomes an allow-listed column unless marked
/// `#[field(skip = true)]`. `#[field(column = "...")]` renames the column and
/// `#[field(ty = "...")]` overrides the inferred column type.
#[proc_macro_derive(Model, attributes(model, field))]
pub fn model_derive(input: TokenStream) -> TokenStream {
    let mut input = parse_macro_input!(input as DeriveInput);
    let attributes = ModelAttributes::extract_attributes(&mut input).unwrap_or_default();
    let name = input.ident;

    let fields = match input.data {
        Data::Struct(ref data) => match data.fields {
            Fields::Named(ref fields) => &fields.named,
            _ => panic!("Model derive macro only supports structs with named fields"),
        },
        _ => panic!("Model derive macro only supports structs"),
    };

    let process::Output {
        columns,
        value_inserts,
    } = process::process_fields(fields);

    let table = attributes.table.unwrap_or_else(|| name.to_string());

    let expanded = quote! {
        impl rusql_crud::Model for #name {
            const NAME: &'static str = #table;
            const COLUMNS: &'static [(&'static str, rusql_crud::ColumnType)] = &[#(#columns),*];

            fn to_values(&self) -> rusql_crud::Values {
                #[allow(unused_mut)]
                let mut values = rusql_crud::Values::new();
                #(#value_inserts)*
                values
            }
        }
    };

    expanded.into()
}
