//! Response conformance checks.

use natprobe_core::{
    AttributeType, MAGIC_COOKIE, MessageType, StunMessage, TransactionId, ValidationError,
    is_comprehension_required, is_supported_required,
};

/// Check a decoded datagram against the response rules, in order:
///
/// 1. type is Binding Success or Binding Error response
/// 2. magic cookie is 0x2112A442
/// 3. declared length is non-zero
/// 4. success responses (and indications) echo `expected` transaction ID
/// 5. success responses carry a (XOR-)MAPPED-ADDRESS
/// 6. error responses carry ERROR-CODE
/// 7. comprehension-required attributes are all in the supported set
///
/// # Errors
///
/// Returns the [`ValidationError`] of the first rule that fails.
pub fn validate_response(
    message: &StunMessage,
    expected: &TransactionId,
) -> Result<(), ValidationError> {
    let message_type = message.message_type();

    if !matches!(
        message_type,
        MessageType::BindingSuccessResponse | MessageType::BindingErrorResponse
    ) {
        return Err(ValidationError::UnsupportedMessageType(message_type.as_u16()));
    }

    if message.magic_cookie() != MAGIC_COOKIE {
        return Err(ValidationError::BadMagicCookie(message.magic_cookie()));
    }

    if message.length() == 0 {
        return Err(ValidationError::EmptyMessage);
    }

    // Indications never pass rule 1 today; the check stays aligned with it.
    if matches!(
        message_type,
        MessageType::BindingSuccessResponse | MessageType::BindingIndication
    ) && message.transaction_id() != expected
    {
        return Err(ValidationError::TransactionMismatch);
    }

    match message_type {
        MessageType::BindingSuccessResponse => {
            let has_address = [
                AttributeType::XorMappedAddress,
                AttributeType::XorMappedAddressLegacy,
                AttributeType::MappedAddress,
            ]
            .into_iter()
            .any(|ty| message.find_attribute(ty).is_some());
            if !has_address {
                return Err(ValidationError::MissingAddressAttribute);
            }
        }
        MessageType::BindingErrorResponse => {
            if message.find_attribute(AttributeType::ErrorCode).is_none() {
                return Err(ValidationError::MissingErrorCode);
            }
        }
        _ => {}
    }

    if let Some(unsupported) = message
        .attributes()
        .iter()
        .map(|a| a.attr_type())
        .find(|&code| is_comprehension_required(code) && !is_supported_required(code))
    {
        return Err(ValidationError::UnsupportedRequiredAttribute(unsupported));
    }

    Ok(())
}
