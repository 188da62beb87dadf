use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{parse::Parse, parse_macro_input};

#[proc_macro]
/// Generates a private `mlog` module whose logging macros are bound to a fixed target.
///
/// # Example
///
/// ```ignore
/// set_mlog!(stringify!(OpticalClusterer));
///
/// mlog::info!("{} duplicate groups", n);
/// ```
pub fn set_mlog(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let minput = parse_macro_input!(input as MInput);

    make_mlog_mod(&minput).into()
}

const TRACE: &str = "trace";
const DEBUG: &str = "debug";
const INFO: &str = "info";
const WARN: &str = "warn";
const ERROR: &str = "error";

fn make_mlog_mod(minput: &MInput) -> TokenStream {
    let target = &minput.target;
    let log_macro_ts = [TRACE, DEBUG, INFO, WARN, ERROR]
        .into_iter()
        .map(|level| define_log_macro(minput, level));

    quote!(
        #[allow(dead_code)]
        mod mlog {
            pub(crate) const TARGET: &str = #target;

            #(
                #log_macro_ts
            )*
        }
    )
}

fn define_log_macro(minput: &MInput, level: &str) -> TokenStream {
    let target = &minput.target;

    // `warn` collides with the builtin lint attribute, so it is defined under another name
    // and re-exported.
    let macro_ident = if level == WARN {
        syn::Ident::new("warns", Span::call_site())
    } else {
        syn::Ident::new(&format!("{}_", level), Span::call_site())
    };
    let level = syn::Ident::new(level, Span::call_site());

    quote!(
        #[allow(unused_macros)]
        macro_rules! #macro_ident {
            ($($tt:tt)+) => {
                log::#level!(target: #target, $($tt)+)
            }
        }

        #[allow(unused_imports)]
        pub(crate) use #macro_ident as #level;
    )
}

struct MInput {
    target: syn::Expr,
}

impl Parse for MInput {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        Ok(Self {
            target: input.parse()?,
        })
    }
}
