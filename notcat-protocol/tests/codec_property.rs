use bytes::BytesMut;
use notcat_protocol::{FrameDecoder, Priority, Record, encode_record};
use proptest::prelude::*;

proptest! {
    #[test]
    fn any_valid_record_round_trips(raw_priority in 0u8..=4, message in ".{0,256}") {
        let record = Record::new(Priority::from_u8(raw_priority).unwrap(), message);
        let frame = encode_record(&record).unwrap();

        let mut buf = BytesMut::from(&frame[..]);
        let decoded = FrameDecoder::default().decode(&mut buf).unwrap();
        prop_assert_eq!(decoded, Some(record));
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn decoder_never_panics_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut buf = BytesMut::from(&bytes[..]);
        let _ = FrameDecoder::default().decode(&mut buf);
    }
}
