//! Binary writer for ROOT's big-endian serialization format.
//!
//! The inverse of [`RBuffer`](crate::rbuffer::RBuffer): primitives, strings,
//! byte-count headers and the class/object tag system used inside a key.

use std::collections::HashMap;

/// Byte-count flag on a version word.
pub const K_BYTE_COUNT_MASK: u32 = 0x4000_0000;
/// Tag announcing a class name the first time it appears in a buffer.
pub const K_NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;
/// Flag marking a back-reference to an already streamed class.
pub const K_CLASS_MASK: u32 = 0x8000_0000;
/// Offset added to map positions so that a valid tag is never 0.
pub const K_MAP_OFFSET: u32 = 2;

/// Default `fBits` written for a `TObject` (kNotDeleted | kIsOnHeap).
pub const TOBJECT_BITS: u32 = 0x0300_0000;

/// A growable big-endian output buffer.
///
/// `origin` is the number of bytes preceding this buffer inside its key
/// record (the key header length); class and object tags are expressed in
/// those key-relative coordinates.
#[derive(Debug, Default)]
pub struct WBuffer {
    data: Vec<u8>,
    origin: usize,
    classes: HashMap<String, u32>,
}

impl WBuffer {
    /// Empty buffer with origin 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty buffer whose first byte sits `origin` bytes into its key.
    pub fn with_origin(origin: usize) -> Self {
        Self { origin, ..Self::default() }
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current position in key-relative coordinates.
    #[inline]
    pub fn key_pos(&self) -> usize {
        self.origin + self.data.len()
    }

    /// Borrow the written bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning the written bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, b: &[u8]) {
        self.data.extend_from_slice(b);
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    /// Write a signed byte.
    pub fn write_i8(&mut self, v: i8) {
        self.data.push(v as u8);
    }

    /// Write a boolean as one byte.
    pub fn write_bool(&mut self, v: bool) {
        self.data.push(u8::from(v));
    }

    /// Write a big-endian u16.
    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Write a big-endian i16.
    pub fn write_i16(&mut self, v: i16) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Write a big-endian u32.
    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Write a big-endian i32.
    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Write a big-endian u64.
    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Write a big-endian i64.
    pub fn write_i64(&mut self, v: i64) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Write a big-endian f32.
    pub fn write_f32(&mut self, v: f32) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Write a big-endian f64.
    pub fn write_f64(&mut self, v: f64) {
        self.write_bytes(&v.to_be_bytes());
    }

    /// Write a ROOT `TString`: 1-byte length (or 255 + u32 length) then bytes.
    pub fn write_string(&mut self, s: &str) {
        let bytes = s.as_bytes();
        if bytes.len() < 255 {
            self.write_u8(bytes.len() as u8);
        } else {
            self.write_u8(255);
            self.write_u32(bytes.len() as u32);
        }
        self.write_bytes(bytes);
    }

    /// Write a NUL-terminated C string.
    pub fn write_cstring(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
        self.write_u8(0);
    }

    /// Reserve a byte-count word and write `version` after it.
    ///
    /// Returns the position to hand to [`set_byte_count`](Self::set_byte_count)
    /// once the object body is written.
    pub fn write_version(&mut self, version: u16) -> usize {
        let pos = self.reserve_byte_count();
        self.write_u16(version);
        pos
    }

    /// Reserve four bytes for a byte count.
    pub fn reserve_byte_count(&mut self) -> usize {
        let pos = self.data.len();
        self.write_u32(0);
        pos
    }

    /// Fill in the byte count reserved at `pos` with everything written since.
    pub fn set_byte_count(&mut self, pos: usize) {
        let count = (self.data.len() - pos - 4) as u32;
        self.data[pos..pos + 4].copy_from_slice(&(count | K_BYTE_COUNT_MASK).to_be_bytes());
    }

    /// Overwrite a big-endian u32 at an earlier position.
    pub fn patch_u32(&mut self, pos: usize, v: u32) {
        self.data[pos..pos + 4].copy_from_slice(&v.to_be_bytes());
    }

    /// Write a `TObject` header (version without byte count, unique id, bits).
    pub fn write_tobject(&mut self) {
        self.write_u16(1);
        self.write_u32(0);
        self.write_u32(TOBJECT_BITS);
    }

    /// Write a `TNamed` with byte count.
    pub fn write_tnamed(&mut self, name: &str, title: &str) {
        let c = self.write_version(1);
        self.write_tobject();
        self.write_string(name);
        self.write_string(title);
        self.set_byte_count(c);
    }

    /// Write a `TArrayD`-style array: i32 length then values.
    pub fn write_tarray_f64(&mut self, values: &[f64]) {
        self.write_i32(values.len() as i32);
        for &v in values {
            self.write_f64(v);
        }
    }

    /// Write a `TArrayF`-style array: i32 length then values.
    pub fn write_tarray_f32(&mut self, values: &[f32]) {
        self.write_i32(values.len() as i32);
        for &v in values {
            self.write_f32(v);
        }
    }

    /// Write a null object pointer.
    pub fn write_null_pointer(&mut self) {
        self.write_u32(0);
    }

    /// Begin a polymorphic object (as written through an object pointer):
    /// reserve the byte count and emit the class tag.
    ///
    /// Returns `(count_pos, object_tag)`; `object_tag` is what a later
    /// reference to the same object writes via
    /// [`write_object_ref`](Self::write_object_ref).
    pub fn begin_object(&mut self, class_name: &str) -> (usize, u32) {
        let count_pos = self.reserve_byte_count();
        let object_tag = (self.origin + count_pos) as u32 + K_MAP_OFFSET;
        self.write_class_tag(class_name);
        (count_pos, object_tag)
    }

    /// Close an object opened with [`begin_object`](Self::begin_object).
    pub fn end_object(&mut self, count_pos: usize) {
        self.set_byte_count(count_pos);
    }

    /// Write a reference to an object already streamed into this buffer.
    pub fn write_object_ref(&mut self, object_tag: u32) {
        self.write_u32(object_tag);
    }

    fn write_class_tag(&mut self, class_name: &str) {
        if let Some(&tag) = self.classes.get(class_name) {
            self.write_u32(tag | K_CLASS_MASK);
            return;
        }
        let tag = self.key_pos() as u32 + K_MAP_OFFSET;
        self.write_u32(K_NEW_CLASS_TAG);
        self.write_cstring(class_name);
        self.classes.insert(class_name.to_string(), tag);
    }
}
