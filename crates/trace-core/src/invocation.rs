//! # Invocation Surface
//!
//! Maps a function name plus positional string arguments onto the contract
//! operations and renders the result as canonical JSON.
//!
//! ## Argument Shapes
//! ```text
//! Create / Update / Package      [ ProductRequest JSON ]
//! Transfer                       [ ProductRequest JSON, new custodian name ]
//! Settle                         [ [SettlementLine, ...] JSON, settlement id ]
//! Query / QueryHistory /
//!   VerifyHistory                [ {"ID", "Manufacturer"} ]
//! QueryByManufacturer            [ {"Manufacturer"} ]
//! QueryHistoryEntry              [ {"ID", "Manufacturer", "Index"} ]
//! QueryHistoryByPackageCode /
//!   QueryRevenueByPackageCode    [ {"Key"} ]
//! ListProductsPage               [ {"PageIndex", "PageSize"} ]
//! Search                         [ {"Keyword"} ]
//! ListProducts / GetID           [ ]
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::TxContext;
use crate::contract::{packaging, product, query, revenue, to_response, transfer};
use crate::error::{CoreError, CoreResult};
use crate::ledger::Ledger;
use crate::types::{
    HistoryIndexQuery, ManufacturerQuery, PackageCodeQuery, PageQuery, ProductQuery,
    ProductRequest, SearchQuery, SettlementLine,
};
use crate::validation::validate_argument_count;

/// Every function name the contract answers to.
pub const FUNCTIONS: &[&str] = &[
    "Create",
    "Update",
    "Package",
    "Transfer",
    "Settle",
    "Query",
    "QueryByManufacturer",
    "QueryHistory",
    "QueryHistoryEntry",
    "QueryHistoryByPackageCode",
    "QueryRevenueByPackageCode",
    "ListProducts",
    "ListProductsPage",
    "Search",
    "VerifyHistory",
    "GetID",
];

/// A named call with positional string arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(function: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a single-argument invocation from a serializable payload.
    pub fn with_json<T: Serialize>(function: impl Into<String>, payload: &T) -> CoreResult<Self> {
        let function = function.into();
        let arg = serde_json::to_string(payload)
            .map_err(|e| CoreError::parse(format!("{function} argument"), e))?;
        Ok(Invocation {
            function,
            args: vec![arg],
        })
    }
}

/// Routes an invocation to its operation.
pub fn dispatch<L: Ledger + ?Sized>(
    ctx: &mut TxContext<'_, L>,
    invocation: &Invocation,
) -> CoreResult<Value> {
    match invocation.function.as_str() {
        "Create" => to_response(&product::create(ctx, &json_arg(invocation)?)?),
        "Update" => to_response(&product::update(ctx, &json_arg(invocation)?)?),
        "Package" => to_response(&packaging::package(ctx, &json_arg(invocation)?)?),
        "Transfer" => {
            let args = arity(invocation, 2)?;
            let request: ProductRequest = decode(&invocation.function, &args[0])?;
            to_response(&transfer::transfer(ctx, &request, &args[1])?)
        }
        "Settle" => {
            let args = arity(invocation, 2)?;
            let lines: Vec<SettlementLine> = decode(&invocation.function, &args[0])?;
            to_response(&revenue::settle(ctx, &lines, &args[1])?)
        }
        "Query" => {
            let request: ProductQuery = json_arg(invocation)?;
            to_response(&query::query(ctx, &request)?)
        }
        "QueryByManufacturer" => {
            let request: ManufacturerQuery = json_arg(invocation)?;
            to_response(&query::query_by_manufacturer(ctx, &request)?)
        }
        "QueryHistory" => {
            let request: ProductQuery = json_arg(invocation)?;
            to_response(&query::query_history(ctx, &request)?)
        }
        "QueryHistoryEntry" => {
            let request: HistoryIndexQuery = json_arg(invocation)?;
            to_response(&query::query_history_entry(ctx, &request)?)
        }
        "QueryHistoryByPackageCode" => {
            let request: PackageCodeQuery = json_arg(invocation)?;
            to_response(&query::query_history_by_package_code(ctx, &request)?)
        }
        "QueryRevenueByPackageCode" => {
            let request: PackageCodeQuery = json_arg(invocation)?;
            to_response(&query::query_revenue_by_package_code(ctx, &request)?)
        }
        "ListProducts" => {
            arity(invocation, 0)?;
            query::list_products(ctx)
        }
        "ListProductsPage" => {
            let request: PageQuery = json_arg(invocation)?;
            query::list_products_page(ctx, &request)
        }
        "Search" => {
            let request: SearchQuery = json_arg(invocation)?;
            query::search(ctx, &request)
        }
        "VerifyHistory" => {
            let request: ProductQuery = json_arg(invocation)?;
            to_response(&query::verify_history(ctx, &request)?)
        }
        "GetID" => {
            arity(invocation, 0)?;
            Ok(Value::String(query::get_id(ctx)))
        }
        other => Err(CoreError::UnknownFunction(other.to_string())),
    }
}

fn arity(invocation: &Invocation, expected: usize) -> CoreResult<&[String]> {
    validate_argument_count(&invocation.function, expected, invocation.args.len())?;
    Ok(&invocation.args)
}

fn json_arg<T: DeserializeOwned>(invocation: &Invocation) -> CoreResult<T> {
    let args = arity(invocation, 1)?;
    decode(&invocation.function, &args[0])
}

fn decode<T: DeserializeOwned>(function: &str, raw: &str) -> CoreResult<T> {
    serde_json::from_str(raw).map_err(|e| CoreError::parse(format!("{function} argument"), e))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TxHeader;
    use crate::error::{ErrorKind, ValidationError};
    use crate::identity::CallerIdentity;
    use crate::ledger::MemoryLedger;
    use serde_json::json;

    fn run(ledger: &MemoryLedger, invocation: &Invocation) -> CoreResult<Value> {
        let caller = CallerIdentity::resolve("x509::CN=alice,OU=client::CN=ca,O=Org");
        let mut ctx = TxContext::new(ledger, caller, TxHeader::new());
        dispatch(&mut ctx, invocation)
    }

    #[test]
    fn test_every_function_is_routed() {
        let ledger = MemoryLedger::new();
        for name in FUNCTIONS {
            let err = run(&ledger, &Invocation::new(*name, ["a", "b", "c"]));
            assert!(
                !matches!(err, Err(CoreError::UnknownFunction(_))),
                "{name} not routed"
            );
        }
    }

    #[test]
    fn test_unknown_function() {
        let ledger = MemoryLedger::new();
        let err = run(&ledger, &Invocation::new("Delete", ["{}"])).unwrap_err();
        assert!(matches!(err, CoreError::UnknownFunction(ref name) if name == "Delete"));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let message = err.to_string();
        assert!(message.starts_with("Unknown function: Delete (expected one of Create, "));
        assert!(message.ends_with("VerifyHistory, GetID)"));
    }

    #[test]
    fn test_wrong_argument_count() {
        let ledger = MemoryLedger::new();
        let err = run(&ledger, &Invocation::new("Transfer", ["{}"])).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::ArgumentCount {
                expected: 2,
                actual: 1,
                ..
            })
        ));

        let err = run(&ledger, &Invocation::new("GetID", ["{}"])).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let ledger = MemoryLedger::new();
        let err = run(&ledger, &Invocation::new("Create", ["{not json"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_get_id_returns_raw_identity() {
        let ledger = MemoryLedger::new();
        let value = run(&ledger, &Invocation::new("GetID", Vec::<String>::new())).unwrap();
        assert_eq!(value, json!("x509::CN=alice,OU=client::CN=ca,O=Org"));
    }

    #[test]
    fn test_create_responds_with_record() {
        let ledger = MemoryLedger::new();
        let invocation = Invocation::with_json(
            "Create",
            &json!({"ID": "P1", "Manufacturer": "M1", "ProductName": "Tea"}),
        )
        .unwrap();
        let value = run(&ledger, &invocation).unwrap();
        assert_eq!(value["ID"], "P1");
        assert_eq!(value["CustodyChain"], json!(["alice"]));
        assert_eq!(value["HashValue"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_invocation_wire_shape() {
        let invocation: Invocation =
            serde_json::from_str(r#"{"function":"ListProducts"}"#).unwrap();
        assert!(invocation.args.is_empty());
    }
}
