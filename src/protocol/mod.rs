//! Protocol Module
//!
//! Defines the Git LFS custom transfer protocol spoken over stdin/stdout.
//!
//! ## Protocol Format (line-delimited JSON)
//!
//! Every message is exactly one JSON object followed by `\n`. The peer blocks
//! waiting for the next line, so every response is flushed as soon as it is
//! written.
//!
//! ### Requests (peer → agent)
//! ```text
//! {"event":"init","operation":"download","remote":"origin","concurrent":true,"concurrenttransfers":3}
//! {"event":"download","oid":"bf3e3e...","size":21245}
//! {"event":"upload","oid":"bf3e3e...","size":21245,"path":"/path/to/file"}
//! {"event":"terminate"}
//! ```
//!
//! ### Responses (agent → peer)
//! ```text
//! {}                                                    init ok
//! {"error":{"code":1,"message":"..."}}                  init failed
//! {"event":"progress","oid":"...","bytesSoFar":1234,"bytesSinceLast":64}
//! {"event":"complete","oid":"...","path":"..."}         download done
//! {"event":"complete","oid":"..."}                      upload done
//! {"event":"complete","oid":"...","error":{...}}        transfer failed
//! ```

mod request;
mod response;
mod codec;
mod sink;

pub use request::{Event, Request};
pub use response::{ErrorBody, InitResponse, ProgressResponse, Response, TransferResponse};
pub use codec::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    write_response,
};
pub use sink::ResponseSink;
