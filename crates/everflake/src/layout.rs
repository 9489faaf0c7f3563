use num_bigint::BigUint;

use crate::{Error, Result, Uid};

/// Total frame width of the fixed encoding, including the sign bit.
pub const TOTAL_BITS: u32 = 64;

/// The decoded field values of an identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fields {
    /// Whole seconds elapsed between the epoch and allocation.
    pub delta_seconds: u64,
    /// The deployment group the allocating instance belongs to.
    pub data_center_id: u64,
    /// The instance within the data center.
    pub worker_id: u64,
    /// Disambiguates allocations within the same second.
    pub sequence: u64,
}

/// An immutable description of how an identifier's bits are partitioned.
///
/// From most to least significant, after the reserved sign bit:
///
/// ```text
/// | sign | delta seconds | data center id | worker id | sequence |
/// | 1bit |  unbounded    |   configured   | configured| configured|
/// ```
///
/// The three sub-second fields plus the sign bit must fit below 64 bits.
/// The timestamp field is not bounded: while the elapsed seconds fit the
/// remaining fixed capacity the whole value packs into a `u64`, and beyond
/// that the identical composition continues over a [`BigUint`]. Once a
/// layout (and its epoch) is serving a fleet it must never change; altering
/// either invalidates every uniqueness guarantee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitLayout {
    timestamp_bits: u32,
    data_center_id_bits: u32,
    worker_id_bits: u32,
    sequence_bits: u32,

    max_data_center_id: u64,
    max_worker_id: u64,
    max_sequence: u64,
    /// `None` when the timestamp field alone overflows the fixed frame, in
    /// which case every value takes the arbitrary-precision path.
    max_fixed_delta_seconds: Option<u64>,

    timestamp_shift: u32,
    data_center_id_shift: u32,
    worker_id_shift: u32,
}

impl BitLayout {
    /// Builds a layout from the four field widths.
    ///
    /// # Errors
    ///
    /// - [`Error::ZeroWidthField`] if any width is zero
    /// - [`Error::LayoutOverflow`] if the sub-second fields plus the sign
    ///   bit reach 64 bits
    pub fn new(
        timestamp_bits: u32,
        data_center_id_bits: u32,
        worker_id_bits: u32,
        sequence_bits: u32,
    ) -> Result<Self> {
        for (field, bits) in [
            ("timestamp bits", timestamp_bits),
            ("data center id bits", data_center_id_bits),
            ("worker id bits", worker_id_bits),
            ("sequence bits", sequence_bits),
        ] {
            if bits == 0 {
                return Err(Error::ZeroWidthField { field });
            }
        }

        // Summed as u64 so absurd configured widths cannot wrap the check.
        let width_sum =
            u64::from(data_center_id_bits) + u64::from(worker_id_bits) + u64::from(sequence_bits);
        if width_sum + 1 >= u64::from(TOTAL_BITS) {
            return Err(Error::LayoutOverflow {
                data_center_id_bits,
                worker_id_bits,
                sequence_bits,
            });
        }
        let sub_second_bits = width_sum as u32;

        // Capacity left for the timestamp inside the fixed frame, sign bit
        // excluded.
        let spare_bits = TOTAL_BITS - 1 - sub_second_bits;
        let max_fixed_delta_seconds = if timestamp_bits <= spare_bits {
            Some(low_mask(timestamp_bits))
        } else {
            None
        };

        Ok(Self {
            timestamp_bits,
            data_center_id_bits,
            worker_id_bits,
            sequence_bits,
            max_data_center_id: low_mask(data_center_id_bits),
            max_worker_id: low_mask(worker_id_bits),
            max_sequence: low_mask(sequence_bits),
            max_fixed_delta_seconds,
            timestamp_shift: sub_second_bits,
            data_center_id_shift: worker_id_bits + sequence_bits,
            worker_id_shift: sequence_bits,
        })
    }

    /// Packs field values into an identifier.
    ///
    /// While `delta_seconds` fits the fixed capacity this composes a `u64`;
    /// beyond that the same shift-and-OR composition runs over a
    /// [`BigUint`]. Callers never need to care which one they got: the
    /// value is self-describing and [`Self::unpack`] detects the encoding
    /// from the bit length.
    ///
    /// # Errors
    ///
    /// [`Error::FieldOverflow`] if any field value exceeds its configured
    /// width. Letting an oversized value through would bleed into the
    /// neighboring fields.
    pub fn pack(
        &self,
        delta_seconds: u64,
        data_center_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Result<Uid> {
        check_field("data center id", data_center_id, self.max_data_center_id)?;
        check_field("worker id", worker_id, self.max_worker_id)?;
        check_field("sequence", sequence, self.max_sequence)?;

        match self.max_fixed_delta_seconds {
            Some(max) if delta_seconds <= max => Ok(Uid::Fixed(
                (delta_seconds << self.timestamp_shift)
                    | (data_center_id << self.data_center_id_shift)
                    | (worker_id << self.worker_id_shift)
                    | sequence,
            )),
            _ => Ok(Uid::Big(
                (BigUint::from(delta_seconds) << self.timestamp_shift)
                    | (BigUint::from(data_center_id) << self.data_center_id_shift)
                    | (BigUint::from(worker_id) << self.worker_id_shift)
                    | BigUint::from(sequence),
            )),
        }
    }

    /// Recovers the field values from an identifier.
    ///
    /// Values whose bit length is below 64 are read through the fixed
    /// 64-bit frame; anything wider is masked field by field over the
    /// arbitrary-precision form. Both paths agree on every value that is
    /// representable in both encodings, so
    /// `unpack(pack(a, b, c, d)) == (a, b, c, d)` for all valid inputs.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUid`] if the decoded timestamp exceeds the range of
    /// a `u64` (only reachable with adversarial input).
    pub fn unpack(&self, uid: &Uid) -> Result<Fields> {
        match uid.to_u64() {
            Some(raw) if uid.bit_len() < u64::from(TOTAL_BITS) => Ok(self.unpack_fixed(raw)),
            _ => self.unpack_wide(uid),
        }
    }

    fn unpack_fixed(&self, raw: u64) -> Fields {
        Fields {
            delta_seconds: raw >> self.timestamp_shift,
            data_center_id: (raw >> self.data_center_id_shift) & self.max_data_center_id,
            worker_id: (raw >> self.worker_id_shift) & self.max_worker_id,
            sequence: raw & self.max_sequence,
        }
    }

    fn unpack_wide(&self, uid: &Uid) -> Result<Fields> {
        let value = uid.to_biguint();
        let field = |shift: u32, max: u64| -> u64 {
            // Masked down to under 64 bits, so a single digit remains.
            ((&value >> shift) & BigUint::from(max))
                .iter_u64_digits()
                .next()
                .unwrap_or(0)
        };

        let delta_seconds =
            u64::try_from(&(&value >> self.timestamp_shift)).map_err(|_| Error::InvalidUid {
                input: uid.to_string(),
            })?;

        Ok(Fields {
            delta_seconds,
            data_center_id: field(self.data_center_id_shift, self.max_data_center_id),
            worker_id: field(self.worker_id_shift, self.max_worker_id),
            sequence: field(0, self.max_sequence),
        })
    }

    /// Width of the timestamp field in bits.
    pub const fn timestamp_bits(&self) -> u32 {
        self.timestamp_bits
    }

    /// Width of the data-center id field in bits.
    pub const fn data_center_id_bits(&self) -> u32 {
        self.data_center_id_bits
    }

    /// Width of the worker id field in bits.
    pub const fn worker_id_bits(&self) -> u32 {
        self.worker_id_bits
    }

    /// Width of the sequence field in bits.
    pub const fn sequence_bits(&self) -> u32 {
        self.sequence_bits
    }

    /// Largest data-center id the layout can encode.
    pub const fn max_data_center_id(&self) -> u64 {
        self.max_data_center_id
    }

    /// Largest worker id the layout can encode.
    pub const fn max_worker_id(&self) -> u64 {
        self.max_worker_id
    }

    /// Largest per-second sequence value the layout can encode.
    pub const fn max_sequence(&self) -> u64 {
        self.max_sequence
    }

    /// Largest delta-seconds value that still packs into the fixed 64-bit
    /// frame, or `None` when the configured timestamp width rules the fixed
    /// path out entirely.
    pub const fn max_fixed_delta_seconds(&self) -> Option<u64> {
        self.max_fixed_delta_seconds
    }
}

/// A mask of `bits` low one-bits. Callers guarantee `bits < 64`.
const fn low_mask(bits: u32) -> u64 {
    (1 << bits) - 1
}

fn check_field(field: &'static str, value: u64, max: u64) -> Result<()> {
    if value > max {
        return Err(Error::FieldOverflow { field, value, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_layout() -> BitLayout {
        BitLayout::new(28, 9, 13, 13).unwrap()
    }

    #[test]
    fn derives_maxes_and_shifts() {
        let layout = default_layout();
        assert_eq!(layout.max_data_center_id(), 511);
        assert_eq!(layout.max_worker_id(), 8191);
        assert_eq!(layout.max_sequence(), 8191);
        assert_eq!(layout.max_fixed_delta_seconds(), Some((1 << 28) - 1));
    }

    #[test]
    fn rejects_zero_width_fields() {
        let err = BitLayout::new(28, 0, 13, 13).unwrap_err();
        assert!(matches!(err, Error::ZeroWidthField { .. }));
    }

    #[test]
    fn rejects_sub_second_fields_that_reach_the_sign_bit() {
        // 30 + 20 + 13 + sign = 64
        let err = BitLayout::new(28, 30, 20, 13).unwrap_err();
        assert!(matches!(err, Error::LayoutOverflow { .. }));

        // one bit less is fine
        BitLayout::new(28, 30, 19, 13).unwrap();
    }

    #[test]
    fn round_trips_fixed_encoding() {
        let layout = default_layout();
        let uid = layout.pack(100, 1, 42, 7).unwrap();
        assert!(matches!(uid, Uid::Fixed(_)));

        let fields = layout.unpack(&uid).unwrap();
        assert_eq!(
            fields,
            Fields {
                delta_seconds: 100,
                data_center_id: 1,
                worker_id: 42,
                sequence: 7
            }
        );
    }

    #[test]
    fn round_trips_at_field_maxima() {
        let layout = default_layout();
        let max_delta = layout.max_fixed_delta_seconds().unwrap();
        let uid = layout.pack(max_delta, 511, 8191, 8191).unwrap();
        assert!(matches!(uid, Uid::Fixed(_)));

        let fields = layout.unpack(&uid).unwrap();
        assert_eq!(fields.delta_seconds, max_delta);
        assert_eq!(fields.data_center_id, 511);
        assert_eq!(fields.worker_id, 8191);
        assert_eq!(fields.sequence, 8191);
    }

    #[test]
    fn switches_to_the_wide_encoding_past_fixed_capacity() {
        let layout = default_layout();
        let max_delta = layout.max_fixed_delta_seconds().unwrap();

        let at_capacity = layout.pack(max_delta, 1, 42, 0).unwrap();
        assert!(matches!(at_capacity, Uid::Fixed(_)));

        let past_capacity = layout.pack(max_delta + 1, 1, 42, 0).unwrap();
        assert!(matches!(past_capacity, Uid::Big(_)));
        assert!(past_capacity.bit_len() >= 64);

        let fields = layout.unpack(&past_capacity).unwrap();
        assert_eq!(fields.delta_seconds, max_delta + 1);
        assert_eq!(fields.data_center_id, 1);
        assert_eq!(fields.worker_id, 42);
        assert_eq!(fields.sequence, 0);
    }

    #[test]
    fn both_encodings_decode_identically_below_64_bits() {
        // A narrow timestamp field switches encodings long before the value
        // outgrows 64 bits; the decoder must not care.
        let layout = BitLayout::new(3, 9, 13, 13).unwrap();
        assert_eq!(layout.max_fixed_delta_seconds(), Some(7));

        let wide = layout.pack(8, 1, 42, 3).unwrap();
        assert!(matches!(wide, Uid::Big(_)));
        assert!(wide.bit_len() < 64);

        let reparsed: Uid = wide.to_string().parse().unwrap();
        assert!(matches!(reparsed, Uid::Fixed(_)));
        assert_eq!(layout.unpack(&wide).unwrap(), layout.unpack(&reparsed).unwrap());
    }

    #[test]
    fn wide_only_layout_never_uses_the_fixed_path() {
        let layout = BitLayout::new(60, 20, 20, 20).unwrap();
        assert_eq!(layout.max_fixed_delta_seconds(), None);

        let uid = layout.pack(0, 1, 2, 3).unwrap();
        assert!(matches!(uid, Uid::Big(_)));

        let fields = layout.unpack(&uid).unwrap();
        assert_eq!(fields.delta_seconds, 0);
        assert_eq!(fields.data_center_id, 1);
        assert_eq!(fields.worker_id, 2);
        assert_eq!(fields.sequence, 3);
    }

    #[test]
    fn refuses_values_wider_than_their_field() {
        let layout = default_layout();
        for (data_center_id, worker_id, sequence) in [(512, 0, 0), (0, 8192, 0), (0, 0, 8192)] {
            let err = layout.pack(0, data_center_id, worker_id, sequence).unwrap_err();
            assert!(matches!(err, Error::FieldOverflow { .. }));
        }
    }

    #[test]
    fn unpack_rejects_timestamps_beyond_u64() {
        let layout = default_layout();
        // delta of 2^70 cannot have been produced by this crate
        let huge = BigUint::from(1u64) << (70u32 + 35);
        let err = layout.unpack(&Uid::Big(huge)).unwrap_err();
        assert!(matches!(err, Error::InvalidUid { .. }));
    }

    #[test]
    fn very_large_deltas_keep_round_tripping() {
        let layout = default_layout();
        // ~8.7 years of fixed capacity, then centuries of wide encoding
        let delta = u64::MAX >> 1;
        let uid = layout.pack(delta, 511, 1, 8191).unwrap();
        let fields = layout.unpack(&uid).unwrap();
        assert_eq!(fields.delta_seconds, delta);
        assert_eq!(fields.data_center_id, 511);
        assert_eq!(fields.worker_id, 1);
        assert_eq!(fields.sequence, 8191);
    }
}
