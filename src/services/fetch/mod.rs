pub mod challenge;
pub mod fetcher;
pub mod headers;
pub mod proxy_pool;
pub mod robots;

pub use challenge::{ChallengeDetector, ChallengeSolver, NullSolver};
pub use fetcher::Fetcher;
pub use headers::HeaderGenerator;
pub use proxy_pool::ProxyPool;
pub use robots::RobotsCache;
