use super::stub::ChaincodeStub;
use super::{Chaincode, ChaincodeError};

const BALANCE_PREFIX: &str = "balance~";

/// Balances `InitLedger` writes before any transfer.
pub const GENESIS_ALLOCATIONS: &[(&str, u64)] = &[
    ("1c5e4a0c2b3f9d8e7a6b5c4d3e2f1a0b9c8d7e6f", 100_000_000),
    ("9e0f4b7d2c1a8e3f5d6c7b8a9f0e1d2c3b4a5f6e", 25_000_000),
];

/// Account-balance contract deployed as `basic`.
pub struct AssetTransfer;

impl AssetTransfer {
    fn balance_key(account: &str) -> String {
        format!("{}{}", BALANCE_PREFIX, account)
    }

    fn balance(stub: &ChaincodeStub<'_>, account: &str) -> Result<u64, ChaincodeError> {
        match stub.get_state(&Self::balance_key(account)) {
            None => Ok(0),
            Some(raw) => std::str::from_utf8(raw)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| {
                    ChaincodeError::Contract(format!("corrupt balance for {}", account))
                }),
        }
    }

    fn set_balance(stub: &mut ChaincodeStub<'_>, account: &str, amount: u64) {
        stub.put_state(&Self::balance_key(account), amount.to_string().into_bytes());
    }

    fn init_ledger(stub: &mut ChaincodeStub<'_>) -> Result<Vec<u8>, ChaincodeError> {
        for (account, amount) in GENESIS_ALLOCATIONS {
            Self::set_balance(stub, account, *amount);
        }
        Ok(Vec::new())
    }

    fn transfer(stub: &mut ChaincodeStub<'_>, args: &[String]) -> Result<Vec<u8>, ChaincodeError> {
        let [from, to, amount] = args else {
            return Err(ChaincodeError::Arity {
                function: "Transfer".to_string(),
                expected: 3,
                actual: args.len(),
            });
        };
        let amount: u64 = amount.parse().map_err(|_| {
            ChaincodeError::Contract(format!("amount {:?} is not a non-negative integer", amount))
        })?;

        let from_balance = Self::balance(stub, from)?;
        if from_balance < amount {
            return Err(ChaincodeError::Contract(format!(
                "client account {} has insufficient funds",
                from
            )));
        }
        Self::set_balance(stub, from, from_balance - amount);

        let to_balance = Self::balance(stub, to)?;
        let credited = to_balance.checked_add(amount).ok_or_else(|| {
            ChaincodeError::Contract(format!("balance overflow for {}", to))
        })?;
        Self::set_balance(stub, to, credited);

        log::debug!("transfer {} -> {} ({}) in {}", from, to, amount, stub.tx_id());
        Ok(Vec::new())
    }

    fn balance_of(stub: &ChaincodeStub<'_>, args: &[String]) -> Result<Vec<u8>, ChaincodeError> {
        let [account] = args else {
            return Err(ChaincodeError::Arity {
                function: "BalanceOf".to_string(),
                expected: 1,
                actual: args.len(),
            });
        };
        Ok(Self::balance(stub, account)?.to_string().into_bytes())
    }
}

impl Chaincode for AssetTransfer {
    fn invoke(
        &self,
        stub: &mut ChaincodeStub<'_>,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ChaincodeError> {
        match function {
            "InitLedger" => Self::init_ledger(stub),
            "Transfer" => Self::transfer(stub, args),
            "BalanceOf" => Self::balance_of(stub, args),
            other => Err(ChaincodeError::UnknownFunction(other.to_string())),
        }
    }
}
