mod error;
pub use error::Error;

mod boundary;
pub use boundary::{Boundary, BOUNDARY_LEN};

mod mime_table;
pub use mime_table::MimeTable;

mod source;
pub use source::{Source, DEFAULT_READ_CAPACITY};

mod part;
pub use part::{Part, Value};

mod format;

mod multipart;
pub use multipart::{Entries, Keys, Multipart, Values};

mod stream;
pub use stream::MultipartStream;

mod pipe;
pub use pipe::{BufferSink, PipeOptions};

mod form_data;
pub use form_data::FormData;

mod header_map;
pub use header_map::HeaderMap;

mod body;
