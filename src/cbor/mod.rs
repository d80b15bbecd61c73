// CBOR structure scanning.
//
// - `header`   : Single item header decoding (major type, argument, length)
// - `tokenizer`: Buffer partitioning into item tokens, with optional descent
//                 into tag-24 embedded CBOR

pub mod header;
pub mod tokenizer;

pub use header::{Header, MajorType, TagContent, TokenizeError, decode_header};
pub use tokenizer::{Token, Tokens, collect_tokens, get_cbor_tokens, tokenize};
