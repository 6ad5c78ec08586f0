use core::alloc::Layout;
use core::fmt::Debug;
use core::mem::align_of;
use core::mem::size_of;
use core::ptr::NonNull;

use super::NULL_KEY;
use super::Table;
use crate::diagnostics::TableDiagnostics;
use crate::error::Error;
use crate::error::Result;

/// Bytes of neighborhood bitmap stored in every slot.
const HOP_BITS_BYTES: usize = size_of::<u32>();

/// Width-specific key access for a [`RawTable`].
///
/// This is the only thing a key width decides: how many bytes a key takes in
/// a slot and how those bytes convert to and from the canonical `i64`. Slot
/// addressing, allocation and growth are shared by every width.
pub trait KeyWidth {
    /// Bytes occupied by a key inside a slot.
    const BYTES: usize;

    /// Creates the per-table key state.
    fn new(diagnostics: bool) -> Self;

    /// Creates the key state for a sibling table produced by
    /// [`Table::new_instance`]. Settings carry over, counters do not.
    fn sibling(&self) -> Self;

    /// Whether `key` is representable in [`BYTES`](KeyWidth::BYTES) bytes.
    fn fits(key: i64) -> bool;

    /// Reads a key and widens it to its canonical form.
    ///
    /// # Safety
    ///
    /// `address` must be valid for reads of `BYTES` bytes. No alignment is
    /// required.
    unsafe fn read(&self, address: *const u8) -> i64;

    /// Narrows `key` and writes it.
    ///
    /// Panics if `key` does not [`fit`](KeyWidth::fits); keys are never
    /// truncated.
    ///
    /// # Safety
    ///
    /// `address` must be valid for writes of `BYTES` bytes. No alignment is
    /// required.
    unsafe fn write(&self, address: *mut u8, key: i64);

    /// Diagnostic capability of this width, if it keeps counters.
    fn diagnostics(&self) -> Option<&dyn TableDiagnostics> {
        None
    }
}

/// 8-byte keys: the canonical width, stored as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct LongKey;

impl KeyWidth for LongKey {
    const BYTES: usize = size_of::<i64>();

    fn new(_diagnostics: bool) -> Self {
        LongKey
    }

    fn sibling(&self) -> Self {
        LongKey
    }

    #[inline(always)]
    fn fits(_key: i64) -> bool {
        true
    }

    #[inline(always)]
    unsafe fn read(&self, address: *const u8) -> i64 {
        // SAFETY: Caller guarantees `address` is valid for 8 bytes of reads.
        unsafe { address.cast::<i64>().read_unaligned() }
    }

    #[inline(always)]
    unsafe fn write(&self, address: *mut u8, key: i64) {
        // SAFETY: Caller guarantees `address` is valid for 8 bytes of writes.
        unsafe { address.cast::<i64>().write_unaligned(key) }
    }
}

/// An exclusively owned, manually allocated block of memory.
///
/// The block is released in `Drop`, so it is released exactly once and can
/// not be reached through its owner afterwards.
struct RawBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

// SAFETY: `RawBlock` is the sole owner of its allocation and hands out
// pointers only through `&self`/`&mut self` of the owning table.
unsafe impl Send for RawBlock {}
// SAFETY: Shared access only reads through the pointer.
unsafe impl Sync for RawBlock {}

impl RawBlock {
    fn allocate_zeroed(layout: Layout) -> Result<Self> {
        debug_assert!(layout.size() != 0);

        #[cfg(test)]
        if ledger::should_fail() {
            return Err(Error::AllocationFailed {
                bytes: layout.size(),
                layout,
            });
        }

        // SAFETY: `layout` has a non-zero size, checked by every caller.
        let raw = unsafe { alloc::alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(Error::AllocationFailed {
            bytes: layout.size(),
            layout,
        })?;

        #[cfg(test)]
        ledger::record_allocation();
        log::trace!("allocated raw table block of {} bytes at {:p}", layout.size(), ptr);

        Ok(RawBlock { ptr, layout })
    }

    #[inline(always)]
    fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for RawBlock {
    fn drop(&mut self) {
        log::trace!(
            "releasing raw table block of {} bytes at {:p}",
            self.layout.size(),
            self.ptr
        );
        // SAFETY: `ptr` was returned by `alloc_zeroed` with this exact layout
        // and, being owned by `self`, has not been released before.
        unsafe {
            alloc::alloc::dealloc(self.ptr.as_ptr(), self.layout);
        }

        #[cfg(test)]
        ledger::record_release();
    }
}

/// Table whose slots live in one manually allocated block.
///
/// Each slot is laid out as `[key: W::BYTES][hop bits: 4][value: size_of::<V>()]`
/// and slot `i` starts at `base + i * stride`. `V` is copied in and out byte
/// for byte, so it should be plain data; sets use `()` which takes no space.
///
/// The block belongs to the table. Dropping the table, including a table
/// superseded by growth, releases it.
pub struct RawTable<V, W: KeyWidth = LongKey> {
    block: RawBlock,
    capacity: usize,
    size: usize,
    value_marker: V,
    diagnostics: bool,
    width: W,
}

/// Raw-memory table with 8-byte keys.
pub type LongKeyRawTable<V> = RawTable<V, LongKey>;

impl<V, W> Debug for RawTable<V, W>
where
    V: Copy + Debug,
    W: KeyWidth + Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawTable")
            .field("capacity", &self.capacity)
            .field("size", &self.size)
            .field("stride", &Self::STRIDE)
            .field("bytes", &self.block.layout.size())
            .field("value_marker", &self.value_marker)
            .field("width", &self.width)
            .finish()
    }
}

impl<V: Copy, W: KeyWidth> RawTable<V, W> {
    const STRIDE: usize = W::BYTES + HOP_BITS_BYTES + size_of::<V>();
    const HOP_BITS_OFFSET: usize = W::BYTES;
    const VALUE_OFFSET: usize = W::BYTES + HOP_BITS_BYTES;

    /// Allocates a table with `capacity` slots, every slot holding the null
    /// key.
    pub fn new(capacity: usize, value_marker: V, diagnostics: bool) -> Result<Self> {
        debug_assert!(capacity.is_power_of_two());
        let bytes = capacity
            .checked_mul(Self::STRIDE)
            .ok_or(Error::CapacityOverflow)?;
        let layout = Layout::from_size_align(bytes, align_of::<u64>())
            .map_err(|_| Error::CapacityOverflow)?;
        let block = RawBlock::allocate_zeroed(layout)?;

        let table = Self {
            block,
            capacity,
            size: 0,
            value_marker,
            diagnostics,
            width: W::new(diagnostics),
        };
        table.fill_null_keys();
        Ok(table)
    }

    /// Bytes between the start of two consecutive slots.
    pub const fn stride() -> usize {
        Self::STRIDE
    }

    /// Size of the block owned by this table.
    pub fn allocated_bytes(&self) -> usize {
        self.block.layout.size()
    }

    /// Key state of this table, including any counters it keeps.
    pub fn width(&self) -> &W {
        &self.width
    }

    fn fill_null_keys(&self) {
        for index in 0..self.capacity {
            // SAFETY: `index` is below capacity, so the slot lies in the block.
            unsafe { self.width.write(self.slot_address(index), NULL_KEY) };
        }
    }

    /// Address of slot `index`.
    ///
    /// Panics when `index` is outside the table, so every pointer derived from
    /// the returned address stays inside the block.
    #[inline(always)]
    fn slot_address(&self, index: usize) -> *mut u8 {
        assert!(
            index < self.capacity,
            "slot index {index} out of range for capacity {}",
            self.capacity
        );
        // SAFETY: `index < capacity` and the block spans `capacity * STRIDE`
        // bytes.
        unsafe { self.block.as_ptr().add(index * Self::STRIDE) }
    }

    #[inline(always)]
    fn hop_bits_address(&self, index: usize) -> *mut u32 {
        // SAFETY: The hop bits lie inside the slot returned by `slot_address`.
        unsafe {
            self.slot_address(index)
                .add(Self::HOP_BITS_OFFSET)
                .cast::<u32>()
        }
    }

    #[inline(always)]
    fn value_address(&self, index: usize) -> *mut V {
        // SAFETY: The value lies inside the slot returned by `slot_address`.
        unsafe { self.slot_address(index).add(Self::VALUE_OFFSET).cast::<V>() }
    }

    #[inline(always)]
    fn write_hop_bits(&mut self, index: usize, bits: u32) {
        // SAFETY: In bounds via `hop_bits_address`; `&mut self` is exclusive.
        unsafe { self.hop_bits_address(index).write_unaligned(bits) }
    }
}

impl<V: Copy, W: KeyWidth> Table for RawTable<V, W> {
    type Value = V;

    fn allocate(capacity: usize, value_marker: V, diagnostics: bool) -> Result<Self> {
        Self::new(capacity, value_marker, diagnostics)
    }

    fn new_instance(&self, capacity: usize) -> Result<Self> {
        let mut table = Self::new(capacity, self.value_marker, self.diagnostics)?;
        table.width = self.width.sibling();
        Ok(table)
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn size(&self) -> usize {
        self.size
    }

    fn value_marker(&self) -> V {
        self.value_marker
    }

    fn check_key(&self, key: i64) {
        assert!(
            key != NULL_KEY,
            "key {key} is reserved as the empty-slot sentinel"
        );
        assert!(
            W::fits(key),
            "key {key} does not fit in a {}-byte key table",
            W::BYTES
        );
    }

    #[inline]
    fn key(&self, index: usize) -> i64 {
        // SAFETY: `slot_address` checks bounds; the key is the slot's prefix.
        unsafe { self.width.read(self.slot_address(index)) }
    }

    #[inline]
    fn hop_bits(&self, index: usize) -> u32 {
        // SAFETY: In bounds via `hop_bits_address`; initialized at allocation.
        unsafe { self.hop_bits_address(index).read_unaligned() }
    }

    #[inline]
    fn put_hop_bit(&mut self, index: usize, distance: usize) {
        let bits = self.hop_bits(index);
        debug_assert!(bits & (1 << distance) == 0);
        self.write_hop_bits(index, bits | (1 << distance));
    }

    #[inline]
    fn remove_hop_bit(&mut self, index: usize, distance: usize) {
        let bits = self.hop_bits(index);
        debug_assert!(bits & (1 << distance) != 0);
        self.write_hop_bits(index, bits & !(1 << distance));
    }

    #[inline]
    fn move_hop_bit(&mut self, index: usize, from: usize, to: usize) {
        let bits = self.hop_bits(index);
        debug_assert!(bits & (1 << from) != 0 && bits & (1 << to) == 0);
        self.write_hop_bits(index, (bits & !(1 << from)) | (1 << to));
    }

    #[inline]
    fn value(&self, index: usize) -> V {
        debug_assert!(self.key(index) != NULL_KEY);
        // SAFETY: In bounds via `value_address`; occupied slots hold a value
        // written by `put` or `put_value`.
        unsafe { self.value_address(index).read_unaligned() }
    }

    #[inline]
    fn put_value(&mut self, index: usize, value: V) -> V {
        let previous = self.value(index);
        // SAFETY: In bounds via `value_address`; `&mut self` is exclusive.
        unsafe { self.value_address(index).write_unaligned(value) };
        previous
    }

    #[inline]
    fn put(&mut self, index: usize, key: i64, value: V) {
        debug_assert!(self.key(index) == NULL_KEY);
        let address = self.slot_address(index);
        // SAFETY: `address` is an in-bounds slot; `&mut self` is exclusive.
        unsafe {
            self.width.write(address, key);
            self.value_address(index).write_unaligned(value);
        }
        self.size += 1;
    }

    #[inline]
    fn remove(&mut self, index: usize) -> V {
        let value = self.value(index);
        // SAFETY: `slot_address` checks bounds; `&mut self` is exclusive.
        unsafe { self.width.write(self.slot_address(index), NULL_KEY) };
        self.size -= 1;
        value
    }

    fn clear(&mut self) {
        // SAFETY: The block spans exactly `layout.size()` bytes.
        unsafe { core::ptr::write_bytes(self.block.as_ptr(), 0, self.block.layout.size()) };
        self.fill_null_keys();
        self.size = 0;
    }

    fn diagnostics(&self) -> Option<&dyn TableDiagnostics> {
        self.width.diagnostics()
    }
}
