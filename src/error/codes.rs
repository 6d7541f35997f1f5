//! Vendor error code tables for `+CME ERROR` and `+CMS ERROR` reports.

macro_rules! define_error_codes {
	// Entry point.
	//
	// Serves to concatenate the parts of the name before defining the constants.
	(
		$(#[doc = $doc:literal])*
		pub mod $module:ident {
			$(
				$num:literal: $($name_word:ident)+
			),+
			$(,)?
		}
	) => {
		paste::paste! {
			define_error_codes!{@with_concatenated_name
				[$($doc)*] $module
				$(
					$num: $($name_word)+, [< $($name_word:camel)+ >]
				),+
			}
		}
	};
	(@with_concatenated_name
		[$($doc:literal)*] $module:ident
		$(
			$num:literal: $($name_word:ident)+, $name:ident
		),+
	) => {
		paste::paste! {
			pub mod $module {
				$(#![doc = $doc])*
				//!
				//! The codes in numerical order are:
				#![doc =
				$( "* `" $num "`: [`" $name:snake:upper "`]\n\n" )+
				]

				$(
					#[doc = $(" " $name_word " ")+ "(code `" $num "`)." ]
					pub const [< $name:snake:upper >] : i32 = $num;
				)+

				/// Get the name of an error code.
				///
				/// If the error code is not recognized, `None` is returned.
				/// The contents of the returned string may change.
				pub const fn name(code: i32) -> Option<&'static str> {
					match code {
						$(
							$num => Some(stringify!($($name_word)+)),
						)+
						_ => None,
					}
				}
			}
		}
	};
}

define_error_codes! {
	/// Equipment (`+CME ERROR`) error codes.
	pub mod cme_code {
		0: Phone Failure,
		1: No Connection To Phone,
		2: Phone Adaptor Link Reserved,
		3: Operation Not Allowed,
		4: Operation Not Supported,
		5: PH SIM PIN Required,
		10: SIM Not Inserted,
		11: SIM PIN Required,
		12: SIM PUK Required,
		13: SIM Failure,
		14: SIM Busy,
		15: SIM Wrong,
		16: Incorrect Password,
		17: SIM PIN2 Required,
		18: SIM PUK2 Required,
		20: Memory Full,
		21: Invalid Index,
		22: Not Found,
		23: Memory Failure,
		24: Text String Too Long,
		25: Invalid Characters In Text String,
		26: Dial String Too Long,
		27: Invalid Characters In Dial String,
		30: No Network Service,
		31: Network Timeout,
		32: Network Not Allowed Emergency Calls Only,
		100: Unknown,
		103: Illegal MS,
		106: Illegal ME,
		107: GPRS Services Not Allowed,
		111: PLMN Not Allowed,
		112: Location Area Not Allowed,
		113: Roaming Not Allowed In This Location Area,
		132: Service Option Not Supported,
		133: Requested Service Option Not Subscribed,
		134: Service Option Temporarily Out Of Order,
		148: Unspecified GPRS Error,
		149: PDP Authentication Failure,
		150: Invalid Mobile Class,
	}
}

define_error_codes! {
	/// Message service (`+CMS ERROR`) error codes.
	pub mod cms_code {
		300: ME Failure,
		301: SMS Service Reserved,
		302: Operation Not Allowed,
		303: Operation Not Supported,
		304: Invalid PDU Mode Parameter,
		305: Invalid Text Mode Parameter,
		310: SIM Not Inserted,
		311: SIM PIN Required,
		312: PH SIM PIN Required,
		313: SIM Failure,
		314: SIM Busy,
		315: SIM Wrong,
		316: SIM PUK Required,
		320: Memory Failure,
		321: Invalid Memory Index,
		322: Memory Full,
		330: SMSC Address Unknown,
		331: No Network Service,
		332: Network Timeout,
		340: No CNMA Acknowledgement Expected,
		500: Unknown Error,
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn equipment_error_code_names() {
		assert_eq!(cme_code::SIM_PIN_REQUIRED, 11);
		assert_eq!(cme_code::name(cme_code::SIM_PIN_REQUIRED), Some("SIM PIN Required"));
		assert_eq!(
			cme_code::name(cme_code::PDP_AUTHENTICATION_FAILURE),
			Some("PDP Authentication Failure")
		);
		assert_eq!(cme_code::name(9999), None);
	}

	#[test]
	fn message_service_error_code_names() {
		assert_eq!(cms_code::SMSC_ADDRESS_UNKNOWN, 330);
		assert_eq!(cms_code::name(500), Some("Unknown Error"));
		assert_eq!(cms_code::name(10), None);
	}
}
