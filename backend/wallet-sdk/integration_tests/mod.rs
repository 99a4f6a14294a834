mod adapter;
mod helpers;
mod wallet;
mod wallet_detached;
