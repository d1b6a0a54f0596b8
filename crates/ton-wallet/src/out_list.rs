//! Wallet V5 extended action list
//!
//! ```text
//! out_list_extended$1 action:ExtendedAction rest:^OutListExtended = OutListExtended;
//! out_list_standard$0 actions:^OutList = OutListExtended;
//! ```
//!
//! Extended actions form a prefix of the list. Each one sits behind a `1` bit
//! and links to the rest through its single reference; a `0` bit ends the chain
//! and points to a standard `OutList` with the send-message actions.

use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, CellSlice};

use crate::action::{load_out_list, store_out_list, OutAction, StandardAction};
use crate::error::{WalletError, WalletResult};

/// Write an extended action list into a builder.
///
/// All extended actions must come before the first send-message action.
pub fn store_out_list_extended(builder: &mut CellBuilder, actions: &[OutAction]) -> WalletResult<()> {
    match actions.split_first() {
        Some((head, rest)) if head.is_extended() => {
            builder.store_bit(true)?;
            head.store_extended(builder)?;

            let mut tail = CellBuilder::new();
            store_out_list_extended(&mut tail, rest)?;
            builder.store_ref(Arc::new(tail.build()?))?;
        }
        _ => {
            let standard = actions
                .iter()
                .map(|action| match action {
                    OutAction::SendMsg(send) => Ok(StandardAction::SendMsg(send.clone())),
                    _ => Err(WalletError::MisorderedExtendedActions),
                })
                .collect::<WalletResult<Vec<_>>>()?;

            builder.store_bit(false)?;
            builder.store_ref(Arc::new(store_out_list(&standard)?))?;
        }
    }
    Ok(())
}

/// Build a cell holding only the extended action list.
pub fn out_list_extended_cell(actions: &[OutAction]) -> WalletResult<Cell> {
    let mut builder = CellBuilder::new();
    store_out_list_extended(&mut builder, actions)?;
    builder.build().map_err(Into::into)
}

enum Link<'a> {
    Extended(&'a Cell),
    Standard(&'a Cell),
}

fn read_link<'a>(slice: &mut CellSlice<'a>, actions: &mut Vec<OutAction>) -> WalletResult<Link<'a>> {
    if slice.load_bit()? {
        actions.push(OutAction::load_extended(slice)?);
        Ok(Link::Extended(slice.load_ref()?))
    } else {
        Ok(Link::Standard(slice.load_ref()?))
    }
}

/// Read an extended action list.
///
/// Fails with [`WalletError::IllegalCodeReplacement`] if the standard part
/// tries to replace the contract code.
pub fn load_out_list_extended(slice: &mut CellSlice<'_>) -> WalletResult<Vec<OutAction>> {
    let mut actions = Vec::new();
    let mut link = read_link(slice, &mut actions)?;

    let standard = loop {
        match link {
            Link::Extended(next) => link = read_link(&mut CellSlice::new(next), &mut actions)?,
            Link::Standard(list) => break load_out_list(list)?,
        }
    };

    for action in standard {
        match action {
            StandardAction::SendMsg(send) => actions.push(OutAction::SendMsg(send)),
            StandardAction::SetCode(_) => return Err(WalletError::IllegalCodeReplacement),
        }
    }
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{
        OutActionSendMsg, ACTION_ADD_EXTENSION_TAG, ACTION_SEND_MSG_TAG,
        ACTION_SET_IS_PUBLIC_KEY_ENABLED_TAG,
    };
    use crate::message::{CommonMsgInfoRelaxed, MessageRelaxed, SendMode};
    use ton_cell::MsgAddress;

    fn mock_message() -> MessageRelaxed {
        let mut body = CellBuilder::new();
        body.store_u8(0).unwrap();
        MessageRelaxed {
            info: CommonMsgInfoRelaxed::ExternalOut {
                src: MsgAddress::Null,
                dest: MsgAddress::Null,
                created_lt: 0,
                created_at: 0,
            },
            init: None,
            body: Arc::new(body.build().unwrap()),
        }
    }

    fn mock_address() -> MsgAddress {
        MsgAddress::from_raw(&format!("0:{}", "1".repeat(64))).unwrap()
    }

    /// Hand-assembled list: add_extension, set_is_public_key_enabled, send_msg.
    fn reference_list(is_enabled: bool) -> Cell {
        let mut msg = CellBuilder::new();
        mock_message().store(&mut msg).unwrap();

        let mut standard = CellBuilder::new();
        standard.store_ref(Arc::new(Cell::empty())).unwrap();
        standard.store_u32(ACTION_SEND_MSG_TAG).unwrap();
        standard.store_u8(SendMode::PAY_GAS_SEPARATELY.bits()).unwrap();
        standard.store_ref(Arc::new(msg.build().unwrap())).unwrap();

        let mut terminator = CellBuilder::new();
        terminator.store_uint(0, 1).unwrap();
        terminator.store_ref(Arc::new(standard.build().unwrap())).unwrap();

        let mut second = CellBuilder::new();
        second.store_uint(1, 1).unwrap();
        second.store_u32(ACTION_SET_IS_PUBLIC_KEY_ENABLED_TAG).unwrap();
        second.store_bit(is_enabled).unwrap();
        second.store_ref(Arc::new(terminator.build().unwrap())).unwrap();

        let mut first = CellBuilder::new();
        first.store_uint(1, 1).unwrap();
        first.store_u32(ACTION_ADD_EXTENSION_TAG).unwrap();
        first.store_address(&mock_address()).unwrap();
        first.store_ref(Arc::new(second.build().unwrap())).unwrap();

        first.build().unwrap()
    }

    fn reference_actions(is_enabled: bool) -> Vec<OutAction> {
        vec![
            OutAction::AddExtension(mock_address()),
            OutAction::SetIsPublicKeyEnabled(is_enabled),
            OutAction::send_msg(SendMode::PAY_GAS_SEPARATELY, mock_message()),
        ]
    }

    #[test]
    fn test_serialize_extended_out_list() {
        let actual = out_list_extended_cell(&reference_actions(false)).unwrap();
        assert_eq!(actual, reference_list(false));
    }

    #[test]
    fn test_deserialize_extended_out_list() {
        let cell = reference_list(true);
        let actions = load_out_list_extended(&mut CellSlice::new(&cell)).unwrap();
        assert_eq!(actions, reference_actions(true));
    }

    #[test]
    fn test_roundtrip_shapes() {
        let send = |value| {
            OutAction::send_msg(
                SendMode::default(),
                MessageRelaxed::internal(mock_address(), value),
            )
        };
        let cases = vec![
            vec![],
            vec![send(1)],
            vec![send(1), send(2), send(3)],
            vec![OutAction::RemoveExtension(mock_address())],
            vec![
                OutAction::SetIsPublicKeyEnabled(true),
                OutAction::AddExtension(MsgAddress::internal(-1, [7; 32])),
                send(10),
            ],
        ];
        for actions in cases {
            let cell = out_list_extended_cell(&actions).unwrap();
            let decoded = load_out_list_extended(&mut CellSlice::new(&cell)).unwrap();
            assert_eq!(decoded, actions);
        }
    }

    #[test]
    fn test_empty_list_layout() {
        let cell = out_list_extended_cell(&[]).unwrap();
        assert_eq!(cell.bit_len(), 1);
        assert_eq!(cell.get_bit(0), Some(false));
        assert_eq!(**cell.reference(0).unwrap(), Cell::empty());
    }

    #[test]
    fn test_extended_after_standard_is_rejected() {
        let actions = vec![
            OutAction::send_msg(SendMode::default(), mock_message()),
            OutAction::AddExtension(mock_address()),
        ];
        assert!(matches!(
            out_list_extended_cell(&actions),
            Err(WalletError::MisorderedExtendedActions)
        ));
    }

    #[test]
    fn test_extended_between_standard_is_rejected() {
        let actions = vec![
            OutAction::SetIsPublicKeyEnabled(false),
            OutAction::send_msg(SendMode::default(), mock_message()),
            OutAction::RemoveExtension(mock_address()),
        ];
        assert!(matches!(
            out_list_extended_cell(&actions),
            Err(WalletError::MisorderedExtendedActions)
        ));
    }

    #[test]
    fn test_set_code_is_rejected() {
        let standard = store_out_list(&[
            StandardAction::SendMsg(OutActionSendMsg::new(SendMode::default(), mock_message())),
            StandardAction::SetCode(Arc::new(Cell::empty())),
        ])
        .unwrap();
        let mut builder = CellBuilder::new();
        builder.store_bit(false).unwrap();
        builder.store_ref(Arc::new(standard)).unwrap();
        let cell = builder.build().unwrap();

        assert!(matches!(
            load_out_list_extended(&mut CellSlice::new(&cell)),
            Err(WalletError::IllegalCodeReplacement)
        ));
    }

    #[test]
    fn test_unknown_tag_in_chain() {
        let mut tail = CellBuilder::new();
        tail.store_bit(true).unwrap();
        tail.store_u32(0x12345678).unwrap();
        tail.store_ref(Arc::new(Cell::empty())).unwrap();

        let mut head = CellBuilder::new();
        head.store_bit(true).unwrap();
        head.store_u32(ACTION_SET_IS_PUBLIC_KEY_ENABLED_TAG).unwrap();
        head.store_bit(true).unwrap();
        head.store_ref(Arc::new(tail.build().unwrap())).unwrap();
        let cell = head.build().unwrap();

        assert!(matches!(
            load_out_list_extended(&mut CellSlice::new(&cell)),
            Err(WalletError::UnknownActionTag(0x12345678))
        ));
    }
}
