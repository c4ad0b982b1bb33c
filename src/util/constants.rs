/// log2 of the number of bytes in a megabyte
pub const LOG_BYTES_IN_MBYTE: u8 = 20;
/// The number of bytes in a megabyte
pub const BYTES_IN_MBYTE: usize = 1 << LOG_BYTES_IN_MBYTE;

/// log2 of the number of bytes in a kilobyte
pub const LOG_BYTES_IN_KBYTE: u8 = 10;
/// The number of bytes in a kilobyte
pub const BYTES_IN_KBYTE: usize = 1 << LOG_BYTES_IN_KBYTE;

#[cfg(target_pointer_width = "32")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 2;
#[cfg(target_pointer_width = "64")]
/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 3;
/// The number of bytes in an address
pub const BYTES_IN_ADDRESS: usize = 1 << LOG_BYTES_IN_ADDRESS;

/// log2 of the number of bytes in a word
pub const LOG_BYTES_IN_WORD: u8 = LOG_BYTES_IN_ADDRESS;
/// The number of bytes in a word
pub const BYTES_IN_WORD: usize = 1 << LOG_BYTES_IN_WORD;

/// log2 of the number of bytes covered by one card table entry
pub const LOG_BYTES_IN_CARD: u8 = 12;
/// The number of bytes covered by one card table entry
pub const BYTES_IN_CARD: usize = 1 << LOG_BYTES_IN_CARD;

/// Object headers hold a class word and a mark word.
pub const OBJECT_HEADER_SIZE: usize = 2 * BYTES_IN_WORD;
/// Every object is at least a header.
pub const MIN_OBJECT_SIZE: usize = OBJECT_HEADER_SIZE;
/// All object sizes and addresses are aligned to this.
pub const OBJECT_ALIGNMENT: usize = BYTES_IN_WORD;

/// The lowest address of the managed heap. Address zero is reserved for null.
pub const HEAP_START: usize = 0x4000_0000;
