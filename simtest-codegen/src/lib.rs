use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use quote::quote_spanned;
use std::path::Path;

/// Turns a function taking `&simtest::SimulationServer` into a test that
/// replays the given fixture files.
///
/// ```ignore
/// #[simulation_test("fixtures/query_collection.json")]
/// fn query_collection(server: &SimulationServer) {
///     // point the client under test at server.url()
/// }
/// ```
///
/// Fixture paths are relative to the crate's manifest directory and are
/// concatenated in the order given. The server is closed even when the body
/// panics.
#[proc_macro_attribute]
pub fn simulation_test(attrs: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let args = syn::parse_macro_input!(attrs as syn::AttributeArgs);

    let attributes = &input.attrs;
    let visibility = &input.vis;
    let name = &input.sig.ident;
    let inputs = &input.sig.inputs;
    let output = &input.sig.output;
    let block = &input.block;

    if args.is_empty() {
        return quote! {
            compile_error!("At least one simulation file should be passed to the macro");
        }
        .into();
    }

    let mut fixture_files = Vec::new();
    for arg in &args {
        if let syn::NestedMeta::Lit(syn::Lit::Str(fixture_file)) = arg {
            if let Err(stream) = validate_fixture_path(fixture_file.value(), fixture_file.span()) {
                return stream.into();
            }
            fixture_files.push(fixture_file.value());
        } else {
            return quote! {
                compile_error!("Every argument should be a string literal!");
            }
            .into();
        }
    }

    if inputs.len() != 1 {
        return quote_spanned! {input.sig.ident.span()=>
            compile_error!("The test function should take exactly one `&SimulationServer` argument!");
        }
        .into();
    }

    if input.sig.asyncness.is_some() {
        return quote_spanned! {input.sig.ident.span()=>
            compile_error!("The test function can't be async!");
        }
        .into();
    }

    let expanded = quote! {
        #[test]
        #(#attributes)*
        #visibility fn #name() #output {
            fn __simulation_test_body(#inputs) #output #block

            let __simulation = simtest::load_simulation_files(
                env!("CARGO_MANIFEST_DIR"),
                &[#(#fixture_files),*],
            )
            .unwrap_or_else(|e| panic!("Simulation Error: {}", e));
            let mut __server = simtest::SimulationServer::start(__simulation)
                .unwrap_or_else(|e| panic!("Simulation Error: {}", e));

            let __result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                __simulation_test_body(&__server)
            }));
            __server.close();

            match __result {
                Ok(value) => value,
                Err(e) => std::panic::resume_unwind(e),
            }
        }
    };

    TokenStream::from(expanded)
}

fn validate_fixture_path<P: AsRef<Path>>(
    path: P,
    span: Span,
) -> Result<(), proc_macro2::TokenStream> {
    if !path.as_ref().to_string_lossy().ends_with(".json") {
        return Err(quote_spanned! {span=>
            compile_error!("The path should point to a .json file!");
        });
    }

    Ok(())
}
