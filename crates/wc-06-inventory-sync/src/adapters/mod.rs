mod chain_gateway;
mod score_book;

pub use score_book::ScoreBook;
