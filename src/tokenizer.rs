// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Token list for one raw message
pub type Tokens = Vec<String>;

/// Split a raw message into its comma-separated fields
///
/// Fields are taken verbatim: no trimming, no interpretation, empty
/// fields preserved. The empty message yields an empty token list.
pub fn tokenize(message: &str) -> Tokens {
	if message.is_empty() {
		return Tokens::new();
	}
	message.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_splits_on_commas() {
		assert_eq!(
			tokenize("0,1,0,10,100.00"),
			vec!["0", "1", "0", "10", "100.00"]
		);
		assert_eq!(tokenize("1,42"), vec!["1", "42"]);
	}

	#[test]
	fn test_single_field() {
		assert_eq!(tokenize("BADMESSAGE"), vec!["BADMESSAGE"]);
	}

	#[test]
	fn test_empty_message_yields_no_tokens() {
		assert!(tokenize("").is_empty());
	}

	#[test]
	fn test_no_trimming_and_empty_fields_kept() {
		assert_eq!(tokenize(" 0, 1 ,"), vec![" 0", " 1 ", ""]);
		assert_eq!(tokenize(",,"), vec!["", "", ""]);
	}
}
