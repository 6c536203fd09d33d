//! Best-effort chain reads.
//!
//! Every read returns `None` when the value is unavailable: the node is
//! unreachable, the call reverted, or reads are disabled. Callers keep
//! their stored state in that case and never substitute a made-up value.

/// A liquidity position as reported by the position manager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainLpPosition {
    pub token_id: String,
    pub pool: String,
    pub token0: String,
    pub token1: String,
    pub fee: u32,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

/// Current price state of a pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot0 {
    pub tick: i32,
    /// Q64.96 as a decimal string.
    pub sqrt_price_x96: String,
}

/// Read access to contract state.
pub trait ChainReader {
    /// ERC-20 `decimals()`.
    fn erc20_decimals(&self, token: &str) -> Option<u32>;

    /// ERC-721 `balanceOf(owner)`.
    fn nft_balance_of(&self, collection: &str, owner: &str) -> Option<u128>;

    /// Every position owned by `owner`, via `balanceOf`,
    /// `tokenOfOwnerByIndex` and `positions`.
    fn lp_positions_of(&self, owner: &str) -> Option<Vec<ChainLpPosition>>;

    /// Pool `fee()`.
    fn pool_fee(&self, pool: &str) -> Option<u32>;

    /// Pool `slot0()`.
    fn pool_slot0(&self, pool: &str) -> Option<Slot0>;
}

/// A reader for which nothing is ever available.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledChainReader;

impl ChainReader for DisabledChainReader {
    fn erc20_decimals(&self, _token: &str) -> Option<u32> {
        None
    }

    fn nft_balance_of(&self, _collection: &str, _owner: &str) -> Option<u128> {
        None
    }

    fn lp_positions_of(&self, _owner: &str) -> Option<Vec<ChainLpPosition>> {
        None
    }

    fn pool_fee(&self, _pool: &str) -> Option<u32> {
        None
    }

    fn pool_slot0(&self, _pool: &str) -> Option<Slot0> {
        None
    }
}
