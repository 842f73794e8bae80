use ethers::prelude::abigen;

abigen!(
    IWitnetRequestFactory,
    r#"[
        function buildRequestTemplate(bytes32[] sourcesIds, bytes32 aggregatorId, bytes32 tallyId, uint16 resultDataMaxSize) external returns (address template)
        event WitnetRequestTemplateBuilt(address template, bool parameterized)
    ]"#
);
