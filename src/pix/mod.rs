pub mod emv;
pub mod txid;
