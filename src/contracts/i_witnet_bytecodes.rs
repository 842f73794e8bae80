use ethers::prelude::*;

// Subset of the Witnet bytecode registry (WitnetBytecodes) used to verify and
// look up Radon descriptors. Solidity enums (DataRequestMethods,
// RadonReducerOpcodes, RadonFilterOpcodes, RadonDataTypes) are ABI-encoded as uint8.

abigen!(
    IWitnetBytecodes,
    r#"[
        {
            "type": "function",
            "name": "verifyRadonRetrieval",
            "stateMutability": "nonpayable",
            "inputs": [
                { "internalType": "enum WitnetV2.DataRequestMethods", "name": "requestMethod", "type": "uint8" },
                { "internalType": "string", "name": "requestSchema", "type": "string" },
                { "internalType": "string", "name": "requestAuthority", "type": "string" },
                { "internalType": "string", "name": "requestPath", "type": "string" },
                { "internalType": "string", "name": "requestQuery", "type": "string" },
                { "internalType": "string", "name": "requestBody", "type": "string" },
                { "internalType": "string[2][]", "name": "requestHeaders", "type": "string[2][]" },
                { "internalType": "bytes", "name": "requestRadonScript", "type": "bytes" }
            ],
            "outputs": [
                { "internalType": "bytes32", "name": "hash", "type": "bytes32" }
            ]
        },
        {
            "type": "function",
            "name": "verifyRadonReducer",
            "stateMutability": "nonpayable",
            "inputs": [
                {
                    "internalType": "struct WitnetV2.RadonReducer",
                    "name": "reducer",
                    "type": "tuple",
                    "components": [
                        { "internalType": "enum WitnetV2.RadonReducerOpcodes", "name": "opcode", "type": "uint8" },
                        {
                            "internalType": "struct WitnetV2.RadonFilter[]",
                            "name": "filters",
                            "type": "tuple[]",
                            "components": [
                                { "internalType": "enum WitnetV2.RadonFilterOpcodes", "name": "opcode", "type": "uint8" },
                                { "internalType": "bytes", "name": "args", "type": "bytes" }
                            ]
                        },
                        { "internalType": "bytes", "name": "script", "type": "bytes" }
                    ]
                }
            ],
            "outputs": [
                { "internalType": "bytes32", "name": "hash", "type": "bytes32" }
            ]
        },
        {
            "type": "function",
            "name": "verifyRadonSLA",
            "stateMutability": "nonpayable",
            "inputs": [
                {
                    "internalType": "struct WitnetV2.RadonSLA",
                    "name": "sla",
                    "type": "tuple",
                    "components": [
                        { "internalType": "uint256", "name": "numWitnesses", "type": "uint256" },
                        { "internalType": "uint256", "name": "minConsensusPercentage", "type": "uint256" },
                        { "internalType": "uint256", "name": "witnessReward", "type": "uint256" },
                        { "internalType": "uint256", "name": "witnessCollateral", "type": "uint256" },
                        { "internalType": "uint256", "name": "minerCommitRevealFee", "type": "uint256" }
                    ]
                }
            ],
            "outputs": [
                { "internalType": "bytes32", "name": "hash", "type": "bytes32" }
            ]
        },
        {
            "type": "function",
            "name": "lookupRadonRetrieval",
            "stateMutability": "view",
            "inputs": [
                { "internalType": "bytes32", "name": "hash", "type": "bytes32" }
            ],
            "outputs": [
                {
                    "internalType": "struct WitnetV2.RadonRetrieval",
                    "name": "",
                    "type": "tuple",
                    "components": [
                        { "internalType": "uint8", "name": "argsCount", "type": "uint8" },
                        { "internalType": "enum WitnetV2.DataRequestMethods", "name": "method", "type": "uint8" },
                        { "internalType": "enum WitnetV2.RadonDataTypes", "name": "resultDataType", "type": "uint8" },
                        { "internalType": "string", "name": "url", "type": "string" },
                        { "internalType": "string", "name": "body", "type": "string" },
                        { "internalType": "string[2][]", "name": "headers", "type": "string[2][]" },
                        { "internalType": "bytes", "name": "script", "type": "bytes" }
                    ]
                }
            ]
        },
        {
            "type": "function",
            "name": "lookupRadonReducer",
            "stateMutability": "view",
            "inputs": [
                { "internalType": "bytes32", "name": "hash", "type": "bytes32" }
            ],
            "outputs": [
                {
                    "internalType": "struct WitnetV2.RadonReducer",
                    "name": "",
                    "type": "tuple",
                    "components": [
                        { "internalType": "enum WitnetV2.RadonReducerOpcodes", "name": "opcode", "type": "uint8" },
                        {
                            "internalType": "struct WitnetV2.RadonFilter[]",
                            "name": "filters",
                            "type": "tuple[]",
                            "components": [
                                { "internalType": "enum WitnetV2.RadonFilterOpcodes", "name": "opcode", "type": "uint8" },
                                { "internalType": "bytes", "name": "args", "type": "bytes" }
                            ]
                        },
                        { "internalType": "bytes", "name": "script", "type": "bytes" }
                    ]
                }
            ]
        },
        {
            "type": "function",
            "name": "lookupRadonSLA",
            "stateMutability": "view",
            "inputs": [
                { "internalType": "bytes32", "name": "hash", "type": "bytes32" }
            ],
            "outputs": [
                {
                    "internalType": "struct WitnetV2.RadonSLA",
                    "name": "",
                    "type": "tuple",
                    "components": [
                        { "internalType": "uint256", "name": "numWitnesses", "type": "uint256" },
                        { "internalType": "uint256", "name": "minConsensusPercentage", "type": "uint256" },
                        { "internalType": "uint256", "name": "witnessReward", "type": "uint256" },
                        { "internalType": "uint256", "name": "witnessCollateral", "type": "uint256" },
                        { "internalType": "uint256", "name": "minerCommitRevealFee", "type": "uint256" }
                    ]
                }
            ]
        },
        {
            "type": "event",
            "name": "NewRadonRetrievalHash",
            "anonymous": false,
            "inputs": [
                { "indexed": false, "internalType": "bytes32", "name": "hash", "type": "bytes32" }
            ]
        },
        {
            "type": "event",
            "name": "NewRadonReducerHash",
            "anonymous": false,
            "inputs": [
                { "indexed": false, "internalType": "bytes32", "name": "hash", "type": "bytes32" }
            ]
        },
        {
            "type": "event",
            "name": "NewSlaHash",
            "anonymous": false,
            "inputs": [
                { "indexed": false, "internalType": "bytes32", "name": "hash", "type": "bytes32" }
            ]
        }
    ]"#
);
