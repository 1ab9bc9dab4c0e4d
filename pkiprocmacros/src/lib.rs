//! Procedural macros used to generate getters and setters for the variant maps used to configure
//! certification path validation (`CertificationPathSettings`) and to collect its results
//! (`CertificationPathResults`).
//!
//! Each macro emits an `impl` block with a `get_<name>` and `set_<name>` method, where `<name>` is the
//! lower case form of the key constant minus its `PS_` or `PR_` prefix. For example:
//!
//! ```ignore
//! cps_gets_and_sets_with_default!(PS_MAX_CHAIN_LENGTH, u8, 32);
//! ```
//!
//! yields `CertificationPathSettings::get_max_chain_length(&self) -> u8` and
//! `CertificationPathSettings::set_max_chain_length(&mut self, v: u8)`.

use proc_macro2::TokenStream;
use proc_macro_error::{abort_call_site, proc_macro_error};
use quote::quote;
use syn::parse::{Parse, ParseStream, Result};
use syn::{Expr, Ident, Token};

type ValueName = Ident;
type ValueType = Ident;
type DefaultValue = Expr;

/// Signature contains the results of parsing a gets_and_sets definition, i.e., the name of a value
/// stored in a map, the corresponding type and, optionally, a default value.
struct Signature {
    value_name: ValueName,
    value_type: ValueType,
    default_value: Option<DefaultValue>,
}

impl Parse for Signature {
    fn parse(stream: ParseStream) -> Result<Self> {
        if stream.is_empty() {
            abort_call_site!("expected a key name and a value type, i.e., PS_NAME, Type");
        }

        let value_name: ValueName = stream.parse()?;
        let _comma: Token!(,) = stream.parse()?;
        let value_type: ValueType = stream.parse()?;
        let default_value = if stream.peek(Token!(,)) {
            let _comma: Token!(,) = stream.parse()?;
            Some(stream.parse()?)
        } else {
            None
        };

        Ok(Signature {
            value_name,
            value_type,
            default_value,
        })
    }
}

/// is_string_numeric is used to determine if a string value contains only numeric characters.
/// It is used to process a slice that omits the first character, i.e., in order to identify
/// types like u8, u32, etc.
fn is_string_numeric(str: &str) -> bool {
    !str.is_empty() && str.chars().all(|c| c.is_numeric())
}

/// Maps a value type to the name of the variant that carries it, i.e., u8 to U8 and bool to Bool.
fn variant_name(value_type: &Ident) -> Ident {
    let type_str = value_type.to_string();
    let variant = if is_string_numeric(&type_str[1..]) {
        type_str.to_uppercase()
    } else if type_str == "bool" {
        "Bool".to_string()
    } else {
        type_str
    };
    Ident::new(&variant, value_type.span())
}

/// Which map the generated accessors target.
enum MapKind {
    Settings,
    Results,
}

fn gets_and_sets(signature: Signature, kind: MapKind) -> TokenStream {
    let flag = signature.value_name;
    let return_t = signature.value_type;
    let variant = variant_name(&return_t);

    let flag_str = flag.to_string()[3..].to_lowercase();
    let getter_str = format!("get_{}", flag_str);
    let setter_str = format!("set_{}", flag_str);
    let getter = Ident::new(&getter_str, flag.span());
    let setter = Ident::new(&setter_str, flag.span());

    let (map, value_enum, key) = match kind {
        MapKind::Settings => (
            quote!(CertificationPathSettings),
            quote!(CertificationPathProcessingTypes),
            quote!(#flag.to_string()),
        ),
        MapKind::Results => (
            quote!(CertificationPathResults),
            quote!(CertificationPathResultsTypes),
            quote!(#flag),
        ),
    };
    let map_name = map.to_string();
    let getter_comment = format!(
        "`{}` is used to retrieve `{}` items from a [`{}`] instance",
        getter_str, flag, map_name
    );
    let setter_comment = format!(
        "`{}` is used to set `{}` items in a [`{}`] instance",
        setter_str, flag, map_name
    );

    let getter_fn = match signature.default_value {
        Some(default_value) => quote! {
            #[doc = #getter_comment]
            pub fn #getter(&self) -> #return_t {
                if self.0.contains_key(#flag) {
                    return match &self.0[#flag] {
                        #value_enum::#variant(v) => v.clone(),
                        _ => #default_value,
                    };
                }
                #default_value
            }
        },
        None => quote! {
            #[doc = #getter_comment]
            pub fn #getter(&self) -> Option<#return_t> {
                if self.0.contains_key(#flag) {
                    return match &self.0[#flag] {
                        #value_enum::#variant(v) => Some(v.clone()),
                        _ => None,
                    };
                }
                None
            }
        },
    };

    quote! {
        impl #map {
            #getter_fn
            #[doc = #setter_comment]
            pub fn #setter(&mut self, v: #return_t) {
                self.0.insert(#key, #value_enum::#variant(v));
            }
        }
    }
}

/// Generates `get_`/`set_` methods on `CertificationPathSettings` for a key with a default value.
#[proc_macro_error]
#[proc_macro]
pub fn cps_gets_and_sets_with_default(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as Signature);
    if signature.default_value.is_none() {
        abort_call_site!("expected a default value, i.e., PS_NAME, Type, default");
    }
    gets_and_sets(signature, MapKind::Settings).into()
}

/// Generates `get_`/`set_` methods on `CertificationPathResults` for a key with no default value.
#[proc_macro_error]
#[proc_macro]
pub fn cpr_gets_and_sets(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as Signature);
    gets_and_sets(signature, MapKind::Results).into()
}

/// Generates `get_`/`set_` methods on `CertificationPathResults` for a key with a default value.
#[proc_macro_error]
#[proc_macro]
pub fn cpr_gets_and_sets_with_default(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let signature = syn::parse_macro_input!(input as Signature);
    if signature.default_value.is_none() {
        abort_call_site!("expected a default value, i.e., PR_NAME, Type, default");
    }
    gets_and_sets(signature, MapKind::Results).into()
}
